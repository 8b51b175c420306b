//! Account-related types for the transfer engine
//!
//! This module defines the Account row, its identifier and status, and the
//! currency code shared by accounts and transfers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::TransferError;

/// Account identifier
///
/// Ordering follows the byte order of the UUID, which is the same as the
/// lexicographic order of its lowercase hyphenated text form. The transfer
/// engine relies on this ordering when it acquires row locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a fresh random account id
    pub fn new_v4() -> Self {
        AccountId(Uuid::new_v4())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(AccountId)
            .map_err(|_| TransferError::validation(format!("Invalid UUID format: '{}'", s)))
    }
}

/// Account lifecycle status
///
/// Only ACTIVE accounts can send or receive transfers or be topped up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    /// Account can be debited and credited
    Active,
    /// Account is temporarily blocked
    Frozen,
    /// Account is permanently closed
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "FROZEN" => Ok(AccountStatus::Frozen),
            "CLOSED" => Ok(AccountStatus::Closed),
            _ => Err(TransferError::validation(
                "status must be one of ACTIVE, FROZEN, CLOSED",
            )),
        }
    }
}

/// Short currency code (e.g. `NGN`, `USD`)
///
/// Transfer requests accept 1 to 3 alphanumeric characters; accounts are
/// provisioned with exactly 3 letters (see [`Currency::iso`]). Codes are
/// compared exactly, without case folding. Deserialization applies the same
/// checks as [`Currency::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a currency code as accepted on a transfer request
    pub fn new(code: impl Into<String>) -> Result<Self, TransferError> {
        let code = code.into();
        if code.is_empty() {
            return Err(TransferError::validation("Currency is required"));
        }
        if code.len() > 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TransferError::validation(format!(
                "Invalid currency code '{}'",
                code
            )));
        }
        Ok(Currency(code))
    }

    /// Parse a currency code as required for account provisioning
    pub fn iso(code: impl Into<String>) -> Result<Self, TransferError> {
        let code = code.into();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TransferError::validation(
                "Currency must be 3 characters (e.g. USD)",
            ));
        }
        Ok(Currency(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = TransferError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Currency::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account row
///
/// Holds the two balance fields and the status. `available_balance` is the
/// spendable balance and `ledger_balance` the book balance; with no hold or
/// reservation concept the two always move together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    /// Identifier of the owning business (1-64 chars)
    pub business_id: String,

    pub currency: Currency,

    /// Spendable balance, never negative at a committed state
    pub available_balance: Decimal,

    /// Book balance, never negative at a committed state
    pub ledger_balance: Decimal,

    pub status: AccountStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new ACTIVE account with zero balances
    pub fn new(business_id: impl Into<String>, currency: Currency) -> Self {
        let now = Utc::now();
        Account {
            id: AccountId::new_v4(),
            business_id: business_id.into(),
            currency,
            available_balance: Decimal::ZERO,
            ledger_balance: Decimal::ZERO,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
