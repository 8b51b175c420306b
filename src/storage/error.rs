//! Storage engine errors
//!
//! These mirror the failure signals of a relational store: deadlock victims,
//! lock wait timeouts, unique and check constraint violations. The transfer
//! engine inspects them to decide whether to retry or re-query.

use thiserror::Error;

use super::lock_manager::{LockKey, TxId};
use crate::types::AccountId;

/// Unique index on `transfers.reference`
pub const TRANSFER_REFERENCE_KEY: &str = "transfers_reference_key";

/// Primary key on `accounts.id`
pub const ACCOUNT_PRIMARY_KEY: &str = "accounts_pkey";

/// Check constraint keeping both balance columns non-negative
pub const NON_NEGATIVE_BALANCE: &str = "accounts_balance_non_negative";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The lock manager chose this transaction as a deadlock victim
    #[error("deadlock detected: transaction {tx} aborted while waiting for {key}")]
    Deadlock { tx: TxId, key: LockKey },

    #[error("lock wait timeout exceeded for {key} after {waited_ms}ms")]
    LockTimeout { key: LockKey, waited_ms: u64 },

    #[error("duplicate key value violates unique constraint \"{constraint}\": {value}")]
    UniqueViolation {
        constraint: &'static str,
        value: String,
    },

    #[error("row for account {account_id} violates check constraint \"{constraint}\"")]
    CheckViolation {
        constraint: &'static str,
        account_id: AccountId,
    },

    #[error("account {account_id} does not exist")]
    RowNotFound { account_id: AccountId },

    #[error("numeric overflow updating balances of account {account_id}")]
    NumericOverflow { account_id: AccountId },
}
