//! Account-facing operations
//!
//! This module provides the `AccountService` struct: account provisioning,
//! status changes, the administrative top-up, and the read paths a reporting
//! layer needs (account lookups, paginated transfer and ledger listings,
//! transfer lookups). Every miss is mapped to a typed [`TransferError`].
//!
//! The top-up is the one write path outside the transfer engine that touches
//! balances. It uses the same locked lookup so it serializes with in-flight
//! transfers on the account.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use super::account_store::AccountStore;
use super::ledger_store::LedgerStore;
use super::transfer_store::TransferStore;
use crate::storage::{Database, Transaction};
use crate::types::{
    validate_amount, Account, AccountId, AccountStatus, Currency, LedgerEntry, Page, Pagination,
    Transfer, TransferError, TransferId,
};

/// Longest accepted business identifier
pub const MAX_BUSINESS_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct AccountService {
    db: Arc<Database>,
    accounts: AccountStore,
    transfers: TransferStore,
    ledger: LedgerStore,
}

impl AccountService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            accounts: AccountStore::new(Arc::clone(&db)),
            transfers: TransferStore::new(Arc::clone(&db)),
            ledger: LedgerStore::new(Arc::clone(&db)),
            db,
        }
    }

    /// Get an account by id
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` - The committed row
    /// * `Err(TransferError::AccountNotFound)` - No such account
    pub fn get_account(&self, id: &AccountId) -> Result<Account, TransferError> {
        self.accounts
            .find_by_id(id)
            .ok_or_else(|| TransferError::account_not_found(*id))
    }

    /// Change an account's status
    ///
    /// Waits for transfers currently holding the account row.
    pub async fn update_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, TransferError> {
        let account = self
            .accounts
            .update_status(id, status)
            .await?
            .ok_or_else(|| TransferError::account_not_found(id))?;
        info!(account_id = %id, %status, "Account status updated");
        Ok(account)
    }

    /// Provision a new ACTIVE account with zero balances
    ///
    /// # Arguments
    ///
    /// * `business_id` - Owning business, 1 to 64 characters
    /// * `currency` - Exactly three ASCII letters
    pub async fn create_account(
        &self,
        business_id: &str,
        currency: &str,
    ) -> Result<Account, TransferError> {
        if business_id.is_empty() {
            return Err(TransferError::validation("Business ID is required"));
        }
        if business_id.chars().count() > MAX_BUSINESS_ID_LEN {
            return Err(TransferError::validation(format!(
                "Business ID must be at most {} characters",
                MAX_BUSINESS_ID_LEN
            )));
        }
        let currency = Currency::iso(currency)?;

        let account = self.accounts.create(business_id, currency).await?;
        info!(account_id = %account.id, business_id, currency = %account.currency, "Account created");
        Ok(account)
    }

    /// Credit an account outside of any transfer
    ///
    /// Locks the account, requires it to be ACTIVE, adds `amount` to both
    /// balance fields and writes one CREDIT ledger entry with no transfer id,
    /// all in one transaction.
    ///
    /// # Returns
    ///
    /// The account as committed
    #[instrument(skip(self), fields(account_id = %id, amount = %amount))]
    pub async fn top_up(&self, id: AccountId, amount: Decimal) -> Result<Account, TransferError> {
        validate_amount(amount)?;

        let mut tx = self.db.begin();
        if let Err(err) = self.apply_top_up(&mut tx, id, amount).await {
            tx.rollback();
            return Err(err);
        }
        tx.commit()?;

        let account = self.get_account(&id)?;
        info!(balance = %account.available_balance, "Account topped up");
        Ok(account)
    }

    async fn apply_top_up(
        &self,
        tx: &mut Transaction,
        id: AccountId,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        let account = self
            .accounts
            .find_by_id_for_update(tx, id)
            .await?
            .ok_or_else(|| TransferError::account_not_found(id))?;
        if !account.is_active() {
            return Err(TransferError::account_not_active(id, account.status));
        }

        let updated = self.accounts.update_balances(tx, id, amount, amount).await?;
        self.ledger
            .create_for_top_up(tx, id, amount, updated.available_balance);
        Ok(())
    }

    /// Transfers touching an account, newest first
    pub fn list_transfers(
        &self,
        id: &AccountId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Transfer>, TransferError> {
        self.get_account(id)?;
        Ok(self
            .transfers
            .list_by_account(id, self.pagination(limit, offset)))
    }

    /// Ledger entries of an account, newest first
    pub fn list_ledger_entries(
        &self,
        id: &AccountId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<LedgerEntry>, TransferError> {
        self.get_account(id)?;
        Ok(self
            .ledger
            .list_by_account(id, self.pagination(limit, offset)))
    }

    pub fn transfer_by_id(&self, id: &TransferId) -> Result<Transfer, TransferError> {
        self.transfers
            .find_by_id(id)
            .ok_or_else(|| TransferError::transfer_not_found(id.to_string()))
    }

    pub fn transfer_by_reference(&self, reference: &str) -> Result<Transfer, TransferError> {
        if reference.trim().is_empty() {
            return Err(TransferError::validation("Reference is required"));
        }
        self.transfers
            .find_by_reference(reference)
            .ok_or_else(|| TransferError::transfer_not_found(reference))
    }

    fn pagination(&self, limit: Option<i64>, offset: Option<i64>) -> Pagination {
        let config = self.db.config();
        Pagination::clamped(
            limit,
            offset,
            config.default_page_limit,
            config.max_page_limit,
        )
    }
}
