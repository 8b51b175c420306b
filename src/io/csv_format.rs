//! CSV output for account balances and demo transfer results
//!
//! Both writers are pure over an `io::Write`, so they are tested against an
//! in-memory buffer. Money columns are written with four decimal places.

use csv::Writer;
use std::io::Write;

use crate::demo::{Direction, PerTransferResult};
use crate::types::Account;

/// Write account balances to CSV format
///
/// Writes accounts in CSV format with columns:
/// id, business_id, currency, available, ledger, status.
/// Accounts are sorted by id for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of accounts to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "business_id", "currency", "available", "ledger", "status"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.business_id,
                account.currency.to_string(),
                format!("{:.4}", account.available_balance),
                format!("{:.4}", account.ledger_balance),
                account.status.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write the per-transfer outcomes of a demo run to CSV format
///
/// Columns: reference, direction, amount, status, transfer_id, error_code.
/// Rows keep the order of `results`; absent values are empty cells.
pub fn write_transfer_results_csv(
    results: &[PerTransferResult],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "reference",
            "direction",
            "amount",
            "status",
            "transfer_id",
            "error_code",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for result in results {
        let direction = match result.direction {
            Direction::SourceToDestination => "source_to_destination",
            Direction::DestinationToSource => "destination_to_source",
        };
        let status = if result.is_completed() {
            "completed"
        } else {
            "failed"
        };
        writer
            .write_record(&[
                result.reference.clone(),
                direction.to_string(),
                format!("{:.4}", result.amount),
                status.to_string(),
                result
                    .transfer_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                result.error_code.clone().unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write transfer record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
