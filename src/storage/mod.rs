//! In-process transactional storage engine
//!
//! Provides what the transfer engine needs from a relational store:
//! - `database`: committed tables and atomic commit
//! - `transaction`: row locks, staged writes, commit/rollback
//! - `lock_manager`: per-row exclusive locks with deadlock detection
//! - `error`: deadlock, lock timeout and constraint violation signals

pub mod database;
pub mod error;
pub mod lock_manager;
pub mod transaction;

pub use database::{Database, Sequenced};
pub use error::{StoreError, ACCOUNT_PRIMARY_KEY, NON_NEGATIVE_BALANCE, TRANSFER_REFERENCE_KEY};
pub use lock_manager::{LockKey, LockManager, RowLock, TxId};
pub use transaction::Transaction;
