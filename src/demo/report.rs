//! Demo request and report types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{validate_amount, AccountId, Currency, TransferError, TransferId};

/// Name reported for the bidirectional scenario
pub const SCENARIO: &str = "concurrent_transfers_bidirectional";

/// Upper bound on transfers fired per direction
pub const MAX_TRANSFERS_PER_DIRECTION: u32 = 100;

/// How many transfers to fire in one direction, and how large each is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionConfig {
    pub count: u32,
    pub amount_per_transfer: Decimal,
}

impl DirectionConfig {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.count < 1 {
            return Err(TransferError::validation("Count must be at least 1"));
        }
        if self.count > MAX_TRANSFERS_PER_DIRECTION {
            return Err(TransferError::validation(format!(
                "Count must be at most {}",
                MAX_TRANSFERS_PER_DIRECTION
            )));
        }
        validate_amount(self.amount_per_transfer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub currency: Currency,
    pub source_to_dest: DirectionConfig,
    pub dest_to_source: DirectionConfig,
}

impl DemoRequest {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.source_account_id == self.destination_account_id {
            return Err(TransferError::validation(
                "Source and destination accounts must be different",
            ));
        }
        self.source_to_dest.validate()?;
        self.dest_to_source.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    SourceToDestination,
    DestinationToSource,
}

impl Direction {
    /// Tag used in generated references
    pub fn tag(&self) -> &'static str {
        match self {
            Direction::SourceToDestination => "a2b",
            Direction::DestinationToSource => "b2a",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    Completed,
    Failed,
}

/// Outcome of one fired transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerTransferResult {
    pub reference: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub status: TransferOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<TransferId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PerTransferResult {
    pub fn is_completed(&self) -> bool {
        self.status == TransferOutcome::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DirectionSummary {
    pub requested: u32,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoSummary {
    pub duration_ms: u64,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub source_balance_before: Decimal,
    pub source_balance_after: Decimal,
    pub destination_balance_before: Decimal,
    pub destination_balance_after: Decimal,
    pub source_to_dest: DirectionSummary,
    pub dest_to_source: DirectionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub scenario: &'static str,
    pub summary: DemoSummary,
    pub transfers: Vec<PerTransferResult>,
}

/// Tally results for one direction
pub fn summarize(
    requested: u32,
    direction: Direction,
    results: &[PerTransferResult],
) -> DirectionSummary {
    results
        .iter()
        .filter(|result| result.direction == direction)
        .fold(
            DirectionSummary {
                requested,
                ..DirectionSummary::default()
            },
            |mut summary, result| {
                if result.is_completed() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                summary
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::valid(1, dec!(10), None)]
    #[case::upper_bound(100, dec!(0.0001), None)]
    #[case::zero_count(0, dec!(10), Some("Count must be at least 1"))]
    #[case::too_many(101, dec!(10), Some("Count must be at most 100"))]
    #[case::zero_amount(5, dec!(0), Some("Amount must be positive"))]
    fn test_direction_validation(
        #[case] count: u32,
        #[case] amount_per_transfer: Decimal,
        #[case] expected: Option<&str>,
    ) {
        let result = DirectionConfig {
            count,
            amount_per_transfer,
        }
        .validate();

        match expected {
            None => assert!(result.is_ok()),
            Some(message) => assert_eq!(result, Err(TransferError::validation(message))),
        }
    }

    #[test]
    fn test_result_serialization_omits_empty_fields() {
        let result = PerTransferResult {
            reference: "demo-1-a2b-0".into(),
            direction: Direction::SourceToDestination,
            amount: dec!(10),
            status: TransferOutcome::Failed,
            transfer_id: None,
            error_code: Some("INSUFFICIENT_BALANCE".into()),
            error_message: Some("Insufficient available balance".into()),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["direction"], "source_to_destination");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["amount"], "10");
        assert!(json.get("transfer_id").is_none());
    }

    #[test]
    fn test_summarize() {
        let result = |direction, status| PerTransferResult {
            reference: String::new(),
            direction,
            amount: dec!(1),
            status,
            transfer_id: None,
            error_code: None,
            error_message: None,
        };
        let results = vec![
            result(Direction::SourceToDestination, TransferOutcome::Completed),
            result(Direction::SourceToDestination, TransferOutcome::Failed),
            result(Direction::DestinationToSource, TransferOutcome::Completed),
        ];

        assert_eq!(
            summarize(2, Direction::SourceToDestination, &results),
            DirectionSummary {
                requested: 2,
                succeeded: 1,
                failed: 1
            }
        );
        assert_eq!(
            summarize(1, Direction::DestinationToSource, &results).succeeded,
            1
        );
    }
}
