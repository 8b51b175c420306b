//! Ledger reconciliation
//!
//! Rebuilds account balances from the append-only ledger and compares them
//! with the stored balance columns. A healthy store satisfies, for every
//! account, `ledger_balance == Σ credits − Σ debits`, and the sum of
//! available balances only changes through top-ups.

use rust_decimal::Decimal;
use serde::Serialize;

use super::account_store::AccountStore;
use super::ledger_store::LedgerStore;
use crate::types::{AccountId, EntryType, LedgerEntry, TransferError};

/// Stored versus reconstructed balances of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReconciliation {
    pub account_id: AccountId,
    pub credits: Decimal,
    pub debits: Decimal,
    /// `credits - debits`
    pub reconstructed_balance: Decimal,
    pub ledger_balance: Decimal,
    pub available_balance: Decimal,
    pub entries: usize,
}

impl AccountReconciliation {
    /// Whether both balance columns agree with the ledger
    pub fn is_balanced(&self) -> bool {
        self.reconstructed_balance == self.ledger_balance
            && self.ledger_balance == self.available_balance
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    accounts: AccountStore,
    ledger: LedgerStore,
}

impl Reconciler {
    pub fn new(accounts: AccountStore, ledger: LedgerStore) -> Self {
        Self { accounts, ledger }
    }

    /// Rebuild one account's balance from its ledger entries
    ///
    /// Reads committed state only; run it while no transfer on the account is
    /// in flight for an exact comparison.
    pub fn reconcile_account(
        &self,
        id: &AccountId,
    ) -> Result<AccountReconciliation, TransferError> {
        let account = self
            .accounts
            .find_by_id(id)
            .ok_or_else(|| TransferError::account_not_found(*id))?;
        let entries = self.ledger.all_for_account(id);

        let sum_of = |entry_type: EntryType| -> Decimal {
            entries
                .iter()
                .filter(|entry| entry.entry_type == entry_type)
                .map(|entry| entry.amount)
                .sum()
        };
        let reconstructed_balance: Decimal = entries.iter().map(LedgerEntry::signed_amount).sum();

        Ok(AccountReconciliation {
            account_id: account.id,
            credits: sum_of(EntryType::Credit),
            debits: sum_of(EntryType::Debit),
            reconstructed_balance,
            ledger_balance: account.ledger_balance,
            available_balance: account.available_balance,
            entries: entries.len(),
        })
    }

    /// Sum of `available_balance` over every account
    pub fn total_available_balance(&self) -> Decimal {
        self.accounts
            .list_all()
            .iter()
            .map(|account| account.available_balance)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AccountService, TransferEngine};
    use crate::storage::Database;
    use crate::types::{Currency, TransferRequest};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ledger_rebuilds_balances_after_transfers() {
        let db = Arc::new(Database::default());
        let service = AccountService::new(Arc::clone(&db));
        let engine = TransferEngine::new(Arc::clone(&db));
        let reconciler = Reconciler::new(engine.accounts().clone(), engine.ledger().clone());

        let a = service.create_account("biz-001", "NGN").await.unwrap();
        let b = service.create_account("biz-002", "NGN").await.unwrap();
        service.top_up(a.id, dec!(1000)).await.unwrap();
        service.top_up(b.id, dec!(50)).await.unwrap();
        let total_before = reconciler.total_available_balance();

        for (i, (source, destination, amount)) in [
            (a.id, b.id, dec!(300.5)),
            (b.id, a.id, dec!(20)),
            (a.id, b.id, dec!(0.0001)),
        ]
        .into_iter()
        .enumerate()
        {
            engine
                .execute_transfer(TransferRequest {
                    source_account_id: source,
                    destination_account_id: destination,
                    amount,
                    currency: Currency::iso("NGN").unwrap(),
                    reference: format!("ref-{}", i),
                })
                .await
                .unwrap();
        }

        let report = reconciler.reconcile_account(&a.id).unwrap();
        assert_eq!(report.credits, dec!(1020));
        assert_eq!(report.debits, dec!(300.5001));
        assert_eq!(report.reconstructed_balance, dec!(719.4999));
        assert_eq!(report.entries, 4);
        assert!(report.is_balanced());

        assert!(reconciler.reconcile_account(&b.id).unwrap().is_balanced());
        assert_eq!(reconciler.total_available_balance(), total_before);
        assert_eq!(total_before, dec!(1050));
    }

    #[test]
    fn test_unknown_account() {
        let db = Arc::new(Database::default());
        let reconciler = Reconciler::new(
            AccountStore::new(Arc::clone(&db)),
            LedgerStore::new(db),
        );
        let missing = AccountId::new_v4();

        assert_eq!(
            reconciler.reconcile_account(&missing),
            Err(TransferError::account_not_found(missing))
        );
    }
}
