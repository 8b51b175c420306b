//! Pagination parameters and result pages for list queries

use serde::Serialize;

/// Limit and offset for a list query, already clamped to legal values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Build pagination from raw caller input
    ///
    /// A missing or zero limit falls back to `default_limit`. The limit is
    /// clamped to `1..=max_limit` and a negative offset becomes 0.
    pub fn clamped(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let max_limit = max_limit.max(1);
        let limit = match limit {
            None | Some(0) => default_limit as i64,
            Some(limit) => limit,
        };
        let limit = limit.clamp(1, max_limit as i64) as usize;
        let offset = offset.unwrap_or(0).max(0) as usize;
        Pagination { limit, offset }
    }
}

/// One page of rows plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// Cut a page out of rows that are already in display order
    pub fn from_sorted(rows: Vec<T>, pagination: Pagination) -> Self {
        let total = rows.len();
        let rows = rows
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .collect();
        Page {
            rows,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::defaults(None, None, 20, 0)]
    #[case::explicit(Some(5), Some(10), 5, 10)]
    #[case::limit_too_large(Some(1000), None, 100, 0)]
    #[case::limit_zero(Some(0), None, 20, 0)]
    #[case::limit_negative(Some(-3), None, 1, 0)]
    #[case::offset_negative(None, Some(-7), 20, 0)]
    fn test_clamped(
        #[case] limit: Option<i64>,
        #[case] offset: Option<i64>,
        #[case] expected_limit: usize,
        #[case] expected_offset: usize,
    ) {
        let pagination = Pagination::clamped(limit, offset, 20, 100);
        assert_eq!(pagination.limit, expected_limit);
        assert_eq!(pagination.offset, expected_offset);
    }

    #[test]
    fn test_page_from_sorted() {
        let page = Page::from_sorted((0..10).collect(), Pagination { limit: 3, offset: 8 });

        assert_eq!(page.rows, vec![8, 9]);
        assert_eq!(page.total, 10);
        assert_eq!(page.limit, 3);
        assert_eq!(page.offset, 8);
    }
}
