//! Error types for the transfer engine
//!
//! Every error a caller can receive is a [`TransferError`]. Each variant maps
//! to a stable machine-readable [`ErrorKind`] so an outer layer can build a
//! response without matching on messages.
//!
//! # Error Categories
//!
//! - **Validation**: malformed input, rejected before any storage access
//! - **Business rules**: not found, not active, currency mismatch, insufficient
//!   balance, same account, idempotency conflict. Never retried.
//! - **Internal**: storage failures, including deadlocks left after the retry
//!   budget is spent

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::{AccountId, AccountStatus, Currency};
use crate::storage::StoreError;

/// Stable, machine-readable classification of a [`TransferError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    AccountNotFound,
    AccountNotActive,
    CurrencyMismatch,
    InsufficientBalance,
    SameAccount,
    IdempotencyConflict,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// Code string exposed to clients
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorKind::AccountNotActive => "ACCOUNT_NOT_ACTIVE",
            ErrorKind::CurrencyMismatch => "CURRENCY_MISMATCH",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::SameAccount => "SAME_ACCOUNT",
            ErrorKind::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status an API layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::AccountNotFound | ErrorKind::NotFound => 404,
            ErrorKind::IdempotencyConflict => 409,
            ErrorKind::AccountNotActive
            | ErrorKind::CurrencyMismatch
            | ErrorKind::InsufficientBalance
            | ErrorKind::SameAccount => 422,
            ErrorKind::Internal => 500,
        }
    }

    /// Short description of the error kind, for documentation output
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Request body or parameters failed validation.",
            ErrorKind::AccountNotFound => "The specified account ID does not exist.",
            ErrorKind::AccountNotActive => {
                "The account is not in ACTIVE status (e.g. FROZEN or CLOSED)."
            }
            ErrorKind::CurrencyMismatch => {
                "Source and destination account currencies do not match the transfer currency."
            }
            ErrorKind::InsufficientBalance => {
                "The source account does not have enough available balance for the transfer."
            }
            ErrorKind::SameAccount => "Source and destination account IDs are the same.",
            ErrorKind::IdempotencyConflict => {
                "The same reference was used with a different amount, accounts, or currency."
            }
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Internal => "An unexpected storage or server error occurred.",
        }
    }
}

/// Main error type for the transfer engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Malformed input
    #[error("{message}")]
    Validation { message: String },

    /// An account id did not resolve
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    /// Source or destination is FROZEN or CLOSED
    #[error("Account {account_id} is not active (status: {status})")]
    AccountNotActive {
        account_id: AccountId,
        status: AccountStatus,
    },

    /// One of the accounts is held in a different currency than requested
    #[error("Source and destination currencies do not match")]
    CurrencyMismatch {
        currency: Currency,
        source_currency: Currency,
        destination_currency: Currency,
    },

    /// Source available balance is below the transfer amount
    #[error("Insufficient available balance")]
    InsufficientBalance {
        account_id: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Source and destination accounts must be different")]
    SameAccount,

    /// Reference reused for a logically different transfer
    #[error(
        "This reference was already used for a transfer with different amount, accounts, or currency"
    )]
    IdempotencyConflict { reference: String },

    /// Transfer lookup by id or reference found nothing
    #[error("Transfer not found: {identifier}")]
    TransferNotFound { identifier: String },

    /// Storage failure; classified as internal
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Stable kind used by outer layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Validation { .. } => ErrorKind::Validation,
            TransferError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            TransferError::AccountNotActive { .. } => ErrorKind::AccountNotActive,
            TransferError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            TransferError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TransferError::SameAccount => ErrorKind::SameAccount,
            TransferError::IdempotencyConflict { .. } => ErrorKind::IdempotencyConflict,
            TransferError::TransferNotFound { .. } => ErrorKind::NotFound,
            TransferError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Whether this is a deadlock reported by the lock manager
    pub fn is_deadlock(&self) -> bool {
        matches!(self, TransferError::Store(StoreError::Deadlock { .. }))
    }

    /// Whether this is a unique index violation on the transfer reference
    pub fn is_reference_conflict(&self) -> bool {
        matches!(self, TransferError::Store(StoreError::UniqueViolation { .. }))
    }
}

// Helper functions for creating common errors

impl TransferError {
    pub fn validation(message: impl Into<String>) -> Self {
        TransferError::Validation {
            message: message.into(),
        }
    }

    pub fn account_not_found(account_id: AccountId) -> Self {
        TransferError::AccountNotFound { account_id }
    }

    pub fn account_not_active(account_id: AccountId, status: AccountStatus) -> Self {
        TransferError::AccountNotActive { account_id, status }
    }

    pub fn currency_mismatch(
        currency: &Currency,
        source_currency: &Currency,
        destination_currency: &Currency,
    ) -> Self {
        TransferError::CurrencyMismatch {
            currency: currency.clone(),
            source_currency: source_currency.clone(),
            destination_currency: destination_currency.clone(),
        }
    }

    pub fn insufficient_balance(
        account_id: AccountId,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        TransferError::InsufficientBalance {
            account_id,
            available,
            requested,
        }
    }

    pub fn idempotency_conflict(reference: &str) -> Self {
        TransferError::IdempotencyConflict {
            reference: reference.to_string(),
        }
    }

    pub fn transfer_not_found(identifier: impl Into<String>) -> Self {
        TransferError::TransferNotFound {
            identifier: identifier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LockKey;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn id(text: &str) -> AccountId {
        text.parse().unwrap()
    }

    fn ngn() -> Currency {
        Currency::new("NGN").unwrap()
    }

    #[rstest]
    #[case::validation(
        TransferError::validation("Amount must be positive"),
        "Amount must be positive"
    )]
    #[case::account_not_found(
        TransferError::account_not_found(id("11111111-1111-1111-1111-111111111111")),
        "Account not found: 11111111-1111-1111-1111-111111111111"
    )]
    #[case::account_not_active(
        TransferError::account_not_active(id("11111111-1111-1111-1111-111111111111"), AccountStatus::Frozen),
        "Account 11111111-1111-1111-1111-111111111111 is not active (status: FROZEN)"
    )]
    #[case::currency_mismatch(
        TransferError::currency_mismatch(&ngn(), &ngn(), &Currency::new("USD").unwrap()),
        "Source and destination currencies do not match"
    )]
    #[case::insufficient_balance(
        TransferError::insufficient_balance(id("11111111-1111-1111-1111-111111111111"), dec!(100000), dec!(200000)),
        "Insufficient available balance"
    )]
    #[case::same_account(
        TransferError::SameAccount,
        "Source and destination accounts must be different"
    )]
    #[case::transfer_not_found(
        TransferError::transfer_not_found("ref-404"),
        "Transfer not found: ref-404"
    )]
    fn test_error_display(#[case] error: TransferError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::validation(TransferError::validation("x"), "VALIDATION_ERROR", 400)]
    #[case::same_account(TransferError::SameAccount, "SAME_ACCOUNT", 422)]
    #[case::conflict(TransferError::idempotency_conflict("ref-1"), "IDEMPOTENCY_CONFLICT", 409)]
    #[case::not_found(TransferError::transfer_not_found("x"), "NOT_FOUND", 404)]
    #[case::deadlock(
        TransferError::from(StoreError::Deadlock { tx: 7, key: LockKey::Reference("ref-1".into()) }),
        "INTERNAL_ERROR",
        500
    )]
    fn test_error_kind_codes(
        #[case] error: TransferError,
        #[case] code: &str,
        #[case] status: u16,
    ) {
        assert_eq!(error.kind().code(), code);
        assert_eq!(error.kind().http_status(), status);
        assert!(!error.kind().description().is_empty());
    }

    #[test]
    fn test_storage_classification() {
        let deadlock = TransferError::from(StoreError::Deadlock {
            tx: 1,
            key: LockKey::Reference("ref-1".into()),
        });
        assert!(deadlock.is_deadlock());
        assert!(!deadlock.is_reference_conflict());

        let unique = TransferError::from(StoreError::UniqueViolation {
            constraint: "transfers_reference_key",
            value: "ref-1".into(),
        });
        assert!(unique.is_reference_conflict());
        assert!(!unique.is_deadlock());

        assert!(!TransferError::SameAccount.is_deadlock());
    }
}
