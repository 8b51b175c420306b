//! Demo account provisioning

use rust_decimal::Decimal;
use tracing::info;

use crate::core::AccountService;
use crate::types::{Account, TransferError};

/// Business ids of the two demo accounts
pub const DEMO_BUSINESS_IDS: [&str; 2] = ["biz-001", "biz-002"];

/// Create the two demo accounts and fund each with `initial_balance`
///
/// Funding goes through the top-up path, so each account starts with one
/// CREDIT ledger entry and reconciles from the first moment. A zero
/// `initial_balance` leaves both accounts empty.
pub async fn seed_demo_accounts(
    service: &AccountService,
    currency: &str,
    initial_balance: Decimal,
) -> Result<(Account, Account), TransferError> {
    let mut seeded = Vec::with_capacity(DEMO_BUSINESS_IDS.len());
    for business_id in DEMO_BUSINESS_IDS {
        let mut account = service.create_account(business_id, currency).await?;
        if initial_balance > Decimal::ZERO {
            account = service.top_up(account.id, initial_balance).await?;
        }
        info!(account_id = %account.id, business_id, balance = %account.available_balance, "Seeded demo account");
        seeded.push(account);
    }

    let second = seeded.pop();
    let first = seeded.pop();
    match (first, second) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(TransferError::validation("Demo seeding created no accounts")),
    }
}
