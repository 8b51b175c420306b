//! Account store
//!
//! This module provides the `AccountStore` struct, the only path through which
//! account rows are created, read and mutated.
//!
//! # Design
//!
//! Reads come in two flavours:
//! - unlocked point lookups against committed state, for read paths
//! - locked lookups inside a caller-supplied [`Transaction`], used by the
//!   transfer engine and the top-up path before mutating balances
//!
//! Balance changes are deltas applied to a row the caller has already locked
//! in the same transaction, so no balance is ever written from a stale read.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::storage::{Database, StoreError, Transaction};
use crate::types::{Account, AccountId, AccountStatus, Currency};

#[derive(Debug, Clone)]
pub struct AccountStore {
    db: Arc<Database>,
}

impl AccountStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create an account with zero balances and ACTIVE status
    ///
    /// # Arguments
    ///
    /// * `business_id` - Identifier of the owning business
    /// * `currency` - Currency the account is held in
    ///
    /// # Returns
    ///
    /// The committed account row
    pub async fn create(
        &self,
        business_id: &str,
        currency: Currency,
    ) -> Result<Account, StoreError> {
        let mut tx = self.db.begin();
        let account = tx.insert_account(Account::new(business_id, currency)).await?;
        tx.commit()?;
        Ok(account)
    }

    /// Unlocked point lookup of committed state
    pub fn find_by_id(&self, id: &AccountId) -> Option<Account> {
        self.db.account(id)
    }

    /// Locked point lookup inside `tx`
    ///
    /// Blocks until no other transaction holds the row. The lock is held until
    /// `tx` commits or rolls back.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(account))` - The row as seen by `tx`, now locked
    /// * `Ok(None)` - No such account
    /// * `Err(StoreError::Deadlock)` - `tx` was chosen as a deadlock victim
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        tx.select_account_for_update(id).await
    }

    /// Set an account's status in its own transaction
    ///
    /// Waits for in-flight transfers holding the row. Returns `None` when the
    /// account does not exist.
    pub async fn update_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Option<Account>, StoreError> {
        let mut tx = self.db.begin();
        match tx.update_account_status(id, status).await? {
            Some(account) => {
                tx.commit()?;
                Ok(Some(account))
            }
            None => {
                tx.rollback();
                Ok(None)
            }
        }
    }

    /// Apply deltas to both balance fields inside `tx`
    ///
    /// # Arguments
    ///
    /// * `tx` - Transaction that has (or will take) the row lock
    /// * `id` - Account to update
    /// * `available_delta` - Signed change to `available_balance`
    /// * `ledger_delta` - Signed change to `ledger_balance`
    ///
    /// # Returns
    ///
    /// The updated row as seen by `tx`
    pub async fn update_balances(
        &self,
        tx: &mut Transaction,
        id: AccountId,
        available_delta: Decimal,
        ledger_delta: Decimal,
    ) -> Result<Account, StoreError> {
        tx.update_account_balances(id, available_delta, ledger_delta)
            .await
    }

    /// All committed accounts, ordered by id
    pub fn list_all(&self) -> Vec<Account> {
        let mut accounts = self.db.accounts();
        accounts.sort_by_key(|account| account.id);
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> AccountStore {
        AccountStore::new(Arc::new(Database::default()))
    }

    fn ngn() -> Currency {
        Currency::iso("NGN").unwrap()
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let store = store();
        let account = store.create("biz-001", ngn()).await.unwrap();

        assert_eq!(account.available_balance, Decimal::ZERO);
        assert_eq!(account.ledger_balance, Decimal::ZERO);
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(store.find_by_id(&account.id), Some(account));
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = store();
        let account = store.create("biz-001", ngn()).await.unwrap();

        let frozen = store
            .update_status(account.id, AccountStatus::Frozen)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frozen.status, AccountStatus::Frozen);
        assert_eq!(
            store.find_by_id(&account.id).unwrap().status,
            AccountStatus::Frozen
        );

        let missing = store
            .update_status(AccountId::new_v4(), AccountStatus::Closed)
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_update_balances_inside_transaction() {
        let db = Arc::new(Database::default());
        let store = AccountStore::new(Arc::clone(&db));
        let account = store.create("biz-001", ngn()).await.unwrap();

        let mut tx = db.begin();
        let locked = store
            .find_by_id_for_update(&mut tx, account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked.id, account.id);

        let updated = store
            .update_balances(&mut tx, account.id, dec!(250.5), dec!(250.5))
            .await
            .unwrap();
        assert_eq!(updated.available_balance, dec!(250.5));
        tx.commit().unwrap();

        let stored = store.find_by_id(&account.id).unwrap();
        assert_eq!(stored.available_balance, dec!(250.5));
        assert_eq!(stored.ledger_balance, dec!(250.5));
    }

    #[tokio::test]
    async fn test_list_all_sorted_by_id() {
        let store = store();
        for business in ["biz-001", "biz-002", "biz-003"] {
            store.create(business, ngn()).await.unwrap();
        }

        let accounts = store.list_all();
        assert_eq!(accounts.len(), 3);
        assert!(accounts.windows(2).all(|pair| pair[0].id < pair[1].id));
    }
}
