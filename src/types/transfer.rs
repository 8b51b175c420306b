//! Transfer-related types for the transfer engine
//!
//! This module defines the persisted Transfer row, the inbound transfer
//! request with its validation rules, and the result returned to callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::{AccountId, Currency};
use super::error::TransferError;

/// Maximum number of fractional digits carried by a money amount
pub const AMOUNT_SCALE: u32 = 4;

/// Maximum length of an idempotency reference
pub const MAX_REFERENCE_LEN: usize = 255;

/// Transfer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new_v4() -> Self {
        TransferId(Uuid::new_v4())
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Transfer status
///
/// Only `Completed` is ever persisted: validation happens before the row is
/// written, so a rejected attempt leaves nothing behind. `Rejected` is kept so
/// the stored status column round-trips the full set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Completed,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted transfer row
///
/// Immutable once created. The `reference` is globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
    pub reference: String,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

/// Inbound request to move money between two accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,

    /// Positive amount with at most [`AMOUNT_SCALE`] fractional digits
    pub amount: Decimal,

    pub currency: Currency,

    /// Client-supplied idempotency key, unique per logical transfer
    pub reference: String,
}

impl TransferRequest {
    /// Check the request shape before it reaches the engine
    ///
    /// Covers what a request validator guarantees upstream: positive amount
    /// within the stored precision and a non-blank bounded reference. Same
    /// account checks are left to the engine, which reports them as
    /// `SameAccount` rather than a validation failure.
    pub fn validate(&self) -> Result<(), TransferError> {
        validate_amount(self.amount)?;

        if self.reference.trim().is_empty() {
            return Err(TransferError::validation("Reference is required"));
        }
        if self.reference.chars().count() > MAX_REFERENCE_LEN {
            return Err(TransferError::validation(format!(
                "Reference must be at most {} characters",
                MAX_REFERENCE_LEN
            )));
        }

        Ok(())
    }

    /// Whether an already stored transfer is the same logical transfer
    ///
    /// Accounts and currency must match exactly; amounts are compared as
    /// numbers, so `5000` matches `5000.0000`.
    pub fn matches(&self, existing: &Transfer) -> bool {
        existing.source_account_id == self.source_account_id
            && existing.destination_account_id == self.destination_account_id
            && existing.currency == self.currency
            && existing.amount == self.amount
    }
}

/// Validate a money amount: positive with at most [`AMOUNT_SCALE`] decimals
pub fn validate_amount(amount: Decimal) -> Result<(), TransferError> {
    if amount <= Decimal::ZERO {
        return Err(TransferError::validation("Amount must be positive"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(TransferError::validation(format!(
            "Amount must have at most {} decimal places",
            AMOUNT_SCALE
        )));
    }
    Ok(())
}

/// Result of a successful (or idempotently replayed) transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub id: TransferId,
    pub reference: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Transfer> for TransferResult {
    fn from(transfer: Transfer) -> Self {
        TransferResult {
            id: transfer.id,
            reference: transfer.reference,
            amount: transfer.amount,
            currency: transfer.currency,
            source_account_id: transfer.source_account_id,
            destination_account_id: transfer.destination_account_id,
            status: transfer.status,
            created_at: transfer.created_at,
        }
    }
}
