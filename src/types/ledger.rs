//! Ledger and audit row types
//!
//! Both tables are append-only. Ledger entries record one side of a money
//! movement; audit rows capture the balance snapshots around a transfer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::{AccountId, Currency};
use super::transfer::TransferId;

/// Side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one side of a money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,

    /// Owning transfer; `None` for administrative top-ups
    pub transfer_id: Option<TransferId>,

    pub account_id: AccountId,

    pub entry_type: EntryType,

    /// Positive magnitude; the sign comes from `entry_type`
    pub amount: Decimal,

    /// Account balance right after this entry was applied
    pub balance_after: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Debit leg of a transfer
    pub fn debit(
        transfer_id: TransferId,
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
    ) -> Self {
        Self::build(Some(transfer_id), account_id, EntryType::Debit, amount, balance_after)
    }

    /// Credit leg of a transfer
    pub fn credit(
        transfer_id: TransferId,
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
    ) -> Self {
        Self::build(Some(transfer_id), account_id, EntryType::Credit, amount, balance_after)
    }

    /// Credit written by an administrative top-up, not linked to a transfer
    pub fn top_up(account_id: AccountId, amount: Decimal, balance_after: Decimal) -> Self {
        Self::build(None, account_id, EntryType::Credit, amount, balance_after)
    }

    fn build(
        transfer_id: Option<TransferId>,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Decimal,
        balance_after: Decimal,
    ) -> Self {
        LedgerEntry {
            id: Uuid::new_v4(),
            transfer_id,
            account_id,
            entry_type,
            amount,
            balance_after: Some(balance_after),
            created_at: Utc::now(),
        }
    }

    /// Amount with its ledger sign applied (credits positive, debits negative)
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => -self.amount,
        }
    }
}

/// User recorded on audit rows; there is no authenticated caller
pub const SYSTEM_USER: &str = "system";

/// Before/after balance snapshot for one completed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: String,
    pub transfer_id: TransferId,
    pub reference: String,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
    pub balance_source_before: Decimal,
    pub balance_source_after: Decimal,
    pub balance_dest_before: Decimal,
    pub balance_dest_after: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_legs_are_linked() {
        let transfer_id = TransferId::new_v4();
        let account = AccountId::new_v4();

        let debit = LedgerEntry::debit(transfer_id, account, dec!(10), dec!(90));
        let credit = LedgerEntry::credit(transfer_id, account, dec!(10), dec!(110));

        assert_eq!(debit.transfer_id, Some(transfer_id));
        assert_eq!(debit.entry_type, EntryType::Debit);
        assert_eq!(debit.balance_after, Some(dec!(90)));
        assert_eq!(credit.entry_type, EntryType::Credit);
        assert_ne!(debit.id, credit.id);
    }

    #[test]
    fn test_top_up_has_no_transfer() {
        let entry = LedgerEntry::top_up(AccountId::new_v4(), dec!(100000), dec!(100000));

        assert_eq!(entry.transfer_id, None);
        assert_eq!(entry.entry_type, EntryType::Credit);
    }

    #[test]
    fn test_signed_amount() {
        let account = AccountId::new_v4();
        let transfer_id = TransferId::new_v4();

        assert_eq!(LedgerEntry::debit(transfer_id, account, dec!(7), dec!(0)).signed_amount(), dec!(-7));
        assert_eq!(LedgerEntry::credit(transfer_id, account, dec!(7), dec!(7)).signed_amount(), dec!(7));
    }
}
