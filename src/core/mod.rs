//! Core business logic module
//!
//! This module contains the transfer processing components:
//! - `engine` - Transfer execution: idempotency, lock ordering, validation, retry
//! - `account_store` - Account rows: locked lookups and balance deltas
//! - `transfer_store` / `ledger_store` / `audit_store` - Append-only records
//! - `account_service` - Provisioning, status changes, top-up and read paths
//! - `reconciliation` - Balance reconstruction from the ledger
//! - `retry` - Bounded deadlock retry

pub mod account_service;
pub mod account_store;
pub mod audit_store;
pub mod engine;
pub mod ledger_store;
pub mod reconciliation;
pub mod retry;
pub mod transfer_store;

pub use account_service::AccountService;
pub use account_store::AccountStore;
pub use audit_store::{AuditStore, BalanceSnapshot};
pub use engine::{lock_order, TransferEngine};
pub use ledger_store::LedgerStore;
pub use reconciliation::{AccountReconciliation, Reconciler};
pub use retry::{run_with_deadlock_retry, MAX_TRANSFER_ATTEMPTS};
pub use transfer_store::TransferStore;
