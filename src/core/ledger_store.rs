//! Ledger store
//!
//! Append-only DEBIT/CREDIT entries. Transfer legs are written by the
//! transfer engine; single CREDIT entries without a transfer are written by
//! the top-up path.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::storage::{Database, Transaction};
use crate::types::{AccountId, LedgerEntry, Page, Pagination, TransferId};

#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: Arc<Database>,
}

impl LedgerStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stage entries in `tx`; they become visible on commit
    pub fn create_many(&self, tx: &mut Transaction, entries: Vec<LedgerEntry>) {
        tx.insert_ledger_entries(entries);
    }

    /// Stage the CREDIT entry of an administrative top-up
    pub fn create_for_top_up(
        &self,
        tx: &mut Transaction,
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
    ) -> LedgerEntry {
        let entry = LedgerEntry::top_up(account_id, amount, balance_after);
        tx.insert_ledger_entries([entry.clone()]);
        entry
    }

    /// Entries of one account, newest first
    pub fn list_by_account(
        &self,
        account_id: &AccountId,
        pagination: Pagination,
    ) -> Page<LedgerEntry> {
        Page::from_sorted(self.all_for_account(account_id), pagination)
    }

    /// Every entry of one account, newest first, unpaginated
    pub fn all_for_account(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        self.db
            .ledger_entries_where(|entry| entry.account_id == *account_id)
    }

    /// Legs of one transfer
    pub fn by_transfer(&self, transfer_id: &TransferId) -> Vec<LedgerEntry> {
        self.db
            .ledger_entries_where(|entry| entry.transfer_id == Some(*transfer_id))
    }

    pub fn count(&self) -> usize {
        self.db.ledger_entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryType;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entries_visible_after_commit() {
        let db = Arc::new(Database::default());
        let store = LedgerStore::new(Arc::clone(&db));
        let account = AccountId::new_v4();
        let transfer_id = TransferId::new_v4();

        let mut tx = db.begin();
        store.create_many(
            &mut tx,
            vec![LedgerEntry::debit(transfer_id, account, dec!(10), dec!(90))],
        );
        let top_up = store.create_for_top_up(&mut tx, account, dec!(5), dec!(95));
        assert_eq!(store.count(), 0);
        tx.commit().unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(top_up.transfer_id, None);
        assert_eq!(top_up.entry_type, EntryType::Credit);
        assert_eq!(store.by_transfer(&transfer_id).len(), 1);

        let page = store.list_by_account(&account, Pagination { limit: 1, offset: 0 });
        assert_eq!(page.total, 2);
        assert_eq!(page.rows, vec![top_up]);
    }
}
