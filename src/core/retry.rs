//! Bounded retry of transactional work on deadlock

use std::future::Future;
use tracing::warn;

use crate::types::TransferError;

/// Attempts per transfer before a deadlock is reported to the caller
pub const MAX_TRANSFER_ATTEMPTS: u32 = 3;

/// Run `attempt` until it succeeds, fails with a non-deadlock error, or
/// `max_attempts` runs have all been deadlock victims
///
/// `attempt` receives the 1-based attempt number and must open its own
/// transaction, so each retry starts from a clean state. After the last
/// attempt the final deadlock error is returned unchanged.
pub async fn run_with_deadlock_retry<T, F, Fut>(
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    let mut number = 1;
    loop {
        match attempt(number).await {
            Err(err) if err.is_deadlock() && number < max_attempts => {
                warn!(attempt = number, max_attempts, error = %err, "Deadlock, retrying");
                number += 1;
            }
            outcome => return outcome,
        }
    }
}
