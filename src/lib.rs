//! Transfer Engine Library
//! # Overview
//!
//! This library moves money between accounts with exactly-once semantics
//! under concurrent load: balances are conserved, no transfer is lost or
//! duplicated, and every balance change is reconstructible from an
//! append-only ledger.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transfer, LedgerEntry, AuditLog, errors)
//! - [`storage`] - In-process transactional store with row locks and deadlock detection
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Transfer execution: idempotency, lock ordering, retry
//!   - [`core::account_store`] - Locked account reads and balance deltas
//!   - [`core::account_service`] - Provisioning, status, top-up, read paths
//!   - [`core::reconciliation`] - Ledger-based balance reconstruction
//! - [`demo`] - Concurrent bidirectional transfer harness
//! - [`io`] - CSV output
//! - [`cli`] / [`logging`] / [`runner`] - The binary's plumbing
//!
//! # Transfer Lifecycle
//!
//! 1. **Validate**: positive amount, bounded reference, distinct accounts
//! 2. **Idempotency**: a known reference returns the stored transfer or conflicts
//! 3. **Lock**: both accounts, ascending by id
//! 4. **Check**: both ACTIVE, matching currency, sufficient available balance
//! 5. **Write**: transfer row, both balance deltas, DEBIT and CREDIT legs, audit row
//! 6. **Commit**: all or nothing; deadlock victims retry up to 3 attempts
//!
//! # Account Balances
//!
//! Each account maintains:
//! - `available_balance`: Funds that can be transferred out
//! - `ledger_balance`: Book balance, always equal to available (no holds)
//! - `status`: ACTIVE, FROZEN or CLOSED; only ACTIVE accounts move money

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod demo;
pub mod io;
pub mod logging;
pub mod runner;
pub mod storage;
pub mod types;

pub use config::StoreConfig;
pub use core::{AccountService, Reconciler, TransferEngine};
pub use demo::{ConcurrencyDemo, DemoReport, DemoRequest};
pub use io::write_accounts_csv;
pub use storage::{Database, StoreError};
pub use types::{
    Account, AccountId, AccountStatus, Currency, ErrorKind, LedgerEntry, Transfer,
    TransferError, TransferId, TransferRequest, TransferResult,
};
