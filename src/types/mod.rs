//! Types module
//!
//! Contains the row types and request/response types used throughout the
//! crate:
//! - `account`: Account row, identifier, status and currency code
//! - `transfer`: Transfer row, transfer request and result
//! - `ledger`: Ledger entries and audit log rows
//! - `page`: Pagination for list queries
//! - `error`: Error types for the transfer engine

pub mod account;
pub mod error;
pub mod ledger;
pub mod page;
pub mod transfer;

pub use account::{Account, AccountId, AccountStatus, Currency};
pub use error::{ErrorKind, TransferError};
pub use ledger::{AuditLog, EntryType, LedgerEntry, SYSTEM_USER};
pub use page::{Page, Pagination};
pub use transfer::{
    validate_amount, Transfer, TransferId, TransferRequest, TransferResult, TransferStatus,
    AMOUNT_SCALE, MAX_REFERENCE_LEN,
};
