//! Concurrency demo harness
//!
//! Fires a burst of transfers in both directions between two accounts, all
//! at once, and reports balances before and after together with the outcome
//! of every transfer. Each transfer runs in its own tokio task so the engine
//! sees genuinely concurrent callers contending for the same two rows.
//!
//! - `report` - Request validation and the serialized report shape
//! - `seed` - Demo account provisioning

pub mod report;
pub mod seed;

pub use report::{
    DemoReport, DemoRequest, DemoSummary, Direction, DirectionConfig, DirectionSummary,
    PerTransferResult, TransferOutcome, MAX_TRANSFERS_PER_DIRECTION, SCENARIO,
};
pub use seed::{seed_demo_accounts, DEMO_BUSINESS_IDS};

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::core::TransferEngine;
use crate::types::{AccountId, ErrorKind, TransferError, TransferRequest, TransferResult};
use report::summarize;

#[derive(Debug, Clone)]
pub struct ConcurrencyDemo {
    engine: TransferEngine,
}

impl ConcurrencyDemo {
    pub fn new(engine: TransferEngine) -> Self {
        Self { engine }
    }

    /// Run the bidirectional scenario
    ///
    /// # Returns
    ///
    /// * `Ok(DemoReport)` - Every transfer ran; individual failures are
    ///   recorded per transfer, not returned
    /// * `Err(TransferError::Validation)` - Invalid demo request
    /// * `Err(TransferError::AccountNotFound)` - Either account is missing
    pub async fn run(&self, request: DemoRequest) -> Result<DemoReport, TransferError> {
        request.validate()?;
        let started = Instant::now();

        let source_before = self.balance_of(&request.source_account_id)?;
        let destination_before = self.balance_of(&request.destination_account_id)?;

        let base_reference = format!("demo-{}", Utc::now().timestamp_millis());
        let planned = plan_transfers(&request, &base_reference);
        info!(
            scenario = SCENARIO,
            transfers = planned.len(),
            %base_reference,
            "Firing concurrent transfers"
        );

        let tasks = planned.iter().cloned().map(|(direction, transfer)| {
            let engine = self.engine.clone();
            tokio::spawn(async move {
                let outcome = engine.execute_transfer(transfer.clone()).await;
                per_transfer_result(direction, transfer, outcome)
            })
        });

        let transfers: Vec<PerTransferResult> = join_all(tasks)
            .await
            .into_iter()
            .zip(planned)
            .map(|(joined, (direction, transfer))| joined_result(direction, transfer, joined))
            .collect();

        let duration_ms = started.elapsed().as_millis() as u64;
        let source_after = self
            .balance_of(&request.source_account_id)
            .unwrap_or(source_before);
        let destination_after = self
            .balance_of(&request.destination_account_id)
            .unwrap_or(destination_before);

        let summary = DemoSummary {
            duration_ms,
            source_account_id: request.source_account_id,
            destination_account_id: request.destination_account_id,
            source_balance_before: source_before,
            source_balance_after: source_after,
            destination_balance_before: destination_before,
            destination_balance_after: destination_after,
            source_to_dest: summarize(
                request.source_to_dest.count,
                Direction::SourceToDestination,
                &transfers,
            ),
            dest_to_source: summarize(
                request.dest_to_source.count,
                Direction::DestinationToSource,
                &transfers,
            ),
        };
        info!(
            duration_ms,
            a2b_succeeded = summary.source_to_dest.succeeded,
            b2a_succeeded = summary.dest_to_source.succeeded,
            "Demo finished"
        );

        Ok(DemoReport {
            scenario: SCENARIO,
            summary,
            transfers,
        })
    }

    fn balance_of(&self, id: &AccountId) -> Result<Decimal, TransferError> {
        self.engine
            .accounts()
            .find_by_id(id)
            .map(|account| account.available_balance)
            .ok_or_else(|| TransferError::account_not_found(*id))
    }
}

/// Every transfer of the scenario, source-to-destination first
fn plan_transfers(request: &DemoRequest, base_reference: &str) -> Vec<(Direction, TransferRequest)> {
    let legs = [
        (
            Direction::SourceToDestination,
            request.source_account_id,
            request.destination_account_id,
            request.source_to_dest,
        ),
        (
            Direction::DestinationToSource,
            request.destination_account_id,
            request.source_account_id,
            request.dest_to_source,
        ),
    ];

    legs.into_iter()
        .flat_map(|(direction, source, destination, config)| {
            (0..config.count).map(move |i| {
                (
                    direction,
                    TransferRequest {
                        source_account_id: source,
                        destination_account_id: destination,
                        amount: config.amount_per_transfer,
                        currency: request.currency.clone(),
                        reference: format!("{}-{}-{}", base_reference, direction.tag(), i),
                    },
                )
            })
        })
        .collect()
}

/// A task that died without reporting still counts as a failed transfer
fn joined_result(
    direction: Direction,
    request: TransferRequest,
    joined: Result<PerTransferResult, JoinError>,
) -> PerTransferResult {
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!(reference = %request.reference, error = %e, "Transfer task panicked");
            PerTransferResult {
                reference: request.reference,
                direction,
                amount: request.amount,
                status: TransferOutcome::Failed,
                transfer_id: None,
                error_code: Some(ErrorKind::Internal.code().to_string()),
                error_message: Some(format!("Transfer task failed: {}", e)),
            }
        }
    }
}

fn per_transfer_result(
    direction: Direction,
    request: TransferRequest,
    outcome: Result<TransferResult, TransferError>,
) -> PerTransferResult {
    match outcome {
        Ok(result) => PerTransferResult {
            reference: result.reference,
            direction,
            amount: result.amount,
            status: TransferOutcome::Completed,
            transfer_id: Some(result.id),
            error_code: None,
            error_message: None,
        },
        Err(err) => PerTransferResult {
            reference: request.reference,
            direction,
            amount: request.amount,
            status: TransferOutcome::Failed,
            transfer_id: None,
            error_code: Some(err.kind().code().to_string()),
            error_message: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AccountService;
    use crate::storage::Database;
    use crate::types::Currency;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup() -> (ConcurrencyDemo, AccountService, AccountId, AccountId) {
        let db = Arc::new(Database::default());
        let service = AccountService::new(Arc::clone(&db));
        let (a, b) = seed_demo_accounts(&service, "NGN", dec!(100000))
            .await
            .unwrap();
        (
            ConcurrencyDemo::new(TransferEngine::new(db)),
            service,
            a.id,
            b.id,
        )
    }

    fn demo_request(a: AccountId, b: AccountId, a2b: (u32, Decimal), b2a: (u32, Decimal)) -> DemoRequest {
        DemoRequest {
            source_account_id: a,
            destination_account_id: b,
            currency: Currency::new("NGN").unwrap(),
            source_to_dest: DirectionConfig {
                count: a2b.0,
                amount_per_transfer: a2b.1,
            },
            dest_to_source: DirectionConfig {
                count: b2a.0,
                amount_per_transfer: b2a.1,
            },
        }
    }

    #[tokio::test]
    async fn test_panicked_task_counts_as_failed() {
        let (a, b) = (AccountId::new_v4(), AccountId::new_v4());
        let plan = plan_transfers(&demo_request(a, b, (1, dec!(5)), (1, dec!(7))), "demo-1");
        let (direction, transfer) = plan[1].clone();

        let handle: tokio::task::JoinHandle<PerTransferResult> =
            tokio::spawn(async { panic!("task blew up") });
        let result = joined_result(direction, transfer, handle.await);

        assert_eq!(result.reference, "demo-1-b2a-0");
        assert_eq!(result.direction, Direction::DestinationToSource);
        assert_eq!(result.amount, dec!(7));
        assert_eq!(result.status, TransferOutcome::Failed);
        assert_eq!(result.transfer_id, None);
        assert_eq!(result.error_code.as_deref(), Some("INTERNAL_ERROR"));

        let completed = PerTransferResult {
            status: TransferOutcome::Completed,
            direction: Direction::SourceToDestination,
            ..result.clone()
        };
        let summary = summarize(1, Direction::DestinationToSource, &[completed, result]);
        assert_eq!(summary.succeeded + summary.failed, summary.requested);
    }

    #[test]
    fn test_plan_references() {
        let (a, b) = (AccountId::new_v4(), AccountId::new_v4());
        let plan = plan_transfers(&demo_request(a, b, (2, dec!(5)), (1, dec!(7))), "demo-42");

        let references: Vec<&str> = plan.iter().map(|(_, t)| t.reference.as_str()).collect();
        assert_eq!(references, vec!["demo-42-a2b-0", "demo-42-a2b-1", "demo-42-b2a-0"]);
        assert_eq!(plan[2].1.source_account_id, b);
        assert_eq!(plan[2].1.amount, dec!(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bidirectional_run() {
        let (demo, _service, a, b) = setup().await;

        let report = demo
            .run(demo_request(a, b, (30, dec!(1000)), (20, dec!(500))))
            .await
            .unwrap();

        assert_eq!(report.scenario, "concurrent_transfers_bidirectional");
        assert_eq!(report.transfers.len(), 50);
        let summary = &report.summary;
        assert_eq!(summary.source_balance_before, dec!(100000));
        assert_eq!(summary.source_balance_after, dec!(80000));
        assert_eq!(summary.destination_balance_after, dec!(120000));
        assert_eq!(
            summary.source_to_dest,
            DirectionSummary {
                requested: 30,
                succeeded: 30,
                failed: 0
            }
        );
        assert_eq!(summary.dest_to_source.succeeded, 20);
        assert!(report.transfers.iter().all(|t| t.transfer_id.is_some()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failures_are_reported_per_transfer() {
        let (demo, _service, a, b) = setup().await;

        // the source funds 5 of 10 unless the reverse transfer lands early
        let report = demo
            .run(demo_request(a, b, (10, dec!(20000)), (1, dec!(100000))))
            .await
            .unwrap();

        let summary = &report.summary;
        assert_eq!(summary.source_to_dest.requested, 10);
        assert_eq!(
            summary.source_to_dest.succeeded + summary.source_to_dest.failed,
            10
        );
        assert_eq!(
            summary.source_balance_after + summary.destination_balance_after,
            dec!(200000)
        );
        let failed = report.transfers.iter().find(|t| !t.is_completed());
        if let Some(failed) = failed {
            assert_eq!(failed.error_code.as_deref(), Some("INSUFFICIENT_BALANCE"));
            assert_eq!(
                failed.error_message.as_deref(),
                Some("Insufficient available balance")
            );
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_requests() {
        let (demo, _service, a, b) = setup().await;

        let err = demo
            .run(demo_request(a, a, (1, dec!(1)), (1, dec!(1))))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::validation("Source and destination accounts must be different")
        );

        let ghost = AccountId::new_v4();
        let err = demo
            .run(demo_request(a, ghost, (1, dec!(1)), (1, dec!(1))))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::account_not_found(ghost));

        let err = demo
            .run(demo_request(a, b, (101, dec!(1)), (1, dec!(1))))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Validation { .. }));
    }
}
