//! Runtime configuration for the storage engine
//!
//! Values come from CLI flags (see [`crate::cli`]) or from [`Default`].
//! Invalid values fall back to the defaults with a warning rather than
//! failing startup.

use std::time::Duration;
use tracing::warn;

/// Configuration for the in-process storage engine and its read paths
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Upper bound for the `limit` of any paginated list query
    pub max_page_limit: usize,

    /// Page size used when a caller does not ask for one
    pub default_page_limit: usize,

    /// How often a blocked lock waiter re-runs deadlock detection
    pub deadlock_check_interval: Duration,

    /// Give up waiting for a row lock after this long; `None` waits forever
    pub lock_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_page_limit: 100,
            default_page_limit: 20,
            deadlock_check_interval: Duration::from_millis(20),
            lock_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Create a StoreConfig with custom values
    pub fn new(
        max_page_limit: usize,
        default_page_limit: usize,
        deadlock_check_interval: Duration,
        lock_timeout: Option<Duration>,
    ) -> Self {
        let default = Self::default();

        let max_page_limit = if max_page_limit == 0 {
            warn!(
                max_page_limit,
                fallback = default.max_page_limit,
                "Invalid max_page_limit, using default"
            );
            default.max_page_limit
        } else {
            max_page_limit
        };

        let default_page_limit = if default_page_limit == 0 || default_page_limit > max_page_limit
        {
            let fallback = default.default_page_limit.min(max_page_limit);
            warn!(
                default_page_limit,
                fallback, "Invalid default_page_limit, using default"
            );
            fallback
        } else {
            default_page_limit
        };

        let deadlock_check_interval = if deadlock_check_interval.is_zero() {
            warn!(
                fallback_ms = default.deadlock_check_interval.as_millis() as u64,
                "Invalid deadlock_check_interval (0), using default"
            );
            default.deadlock_check_interval
        } else {
            deadlock_check_interval
        };

        let lock_timeout = lock_timeout.filter(|timeout| !timeout.is_zero());

        Self {
            max_page_limit,
            default_page_limit,
            deadlock_check_interval,
            lock_timeout,
        }
    }
}
