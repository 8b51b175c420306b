//! End-to-end demo run behind the binary
//!
//! Seeds the two demo accounts, fires the concurrent scenario, checks that
//! money was conserved and that both accounts reconcile against the ledger,
//! then writes the report in the requested format.

use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::cli::{CliArgs, OutputFormat};
use crate::core::{AccountService, Reconciler, TransferEngine};
use crate::demo::{seed_demo_accounts, ConcurrencyDemo, DemoReport};
use crate::io::{write_accounts_csv, write_transfer_results_csv};
use crate::storage::Database;

/// Run the demo described by `args` and write the report to `output`
///
/// # Returns
///
/// * `Ok(DemoReport)` - The run completed and every invariant check passed
/// * `Err(String)` - Setup failed, an invariant was violated, or the report
///   could not be written
pub async fn run(args: &CliArgs, output: &mut dyn Write) -> Result<DemoReport, String> {
    let db = Arc::new(Database::new(args.to_store_config()));
    let service = AccountService::new(Arc::clone(&db));
    let engine = TransferEngine::new(db);

    let (first, second) = seed_demo_accounts(&service, &args.currency, args.initial_balance)
        .await
        .map_err(|e| format!("Failed to seed demo accounts: {}", e))?;

    let request = args
        .to_demo_request(first.id, second.id)
        .map_err(|e| format!("Invalid demo request: {}", e))?;
    let report = ConcurrencyDemo::new(engine.clone())
        .run(request)
        .await
        .map_err(|e| format!("Demo failed: {}", e))?;

    verify(&engine, &report)?;

    match args.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *output, &report)
                .map_err(|e| format!("Failed to write JSON report: {}", e))?;
            writeln!(output).map_err(|e| format!("Failed to write output: {}", e))?;
        }
        OutputFormat::Csv => {
            write_accounts_csv(&engine.accounts().list_all(), output)?;
            writeln!(output).map_err(|e| format!("Failed to write output: {}", e))?;
            write_transfer_results_csv(&report.transfers, output)?;
        }
    }

    Ok(report)
}

/// Conservation across the pair and per-account ledger reconciliation
fn verify(engine: &TransferEngine, report: &DemoReport) -> Result<(), String> {
    let summary = &report.summary;
    let before = summary.source_balance_before + summary.destination_balance_before;
    let after = summary.source_balance_after + summary.destination_balance_after;
    if before != after {
        return Err(format!(
            "Balance not conserved: {} before, {} after",
            before, after
        ));
    }

    let reconciler = Reconciler::new(engine.accounts().clone(), engine.ledger().clone());
    for id in [&summary.source_account_id, &summary.destination_account_id] {
        let reconciliation = reconciler
            .reconcile_account(id)
            .map_err(|e| e.to_string())?;
        if !reconciliation.is_balanced() {
            return Err(format!(
                "Ledger does not reconcile for account {}: ledger says {}, balance is {}",
                id, reconciliation.reconstructed_balance, reconciliation.available_balance
            ));
        }
    }

    info!(total = %after, "Balances conserved and reconciled");
    Ok(())
}
