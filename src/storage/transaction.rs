//! Transactions over the in-process storage engine
//!
//! A [`Transaction`] holds row locks and a private working set. Account rows
//! are read into the working set under an exclusive lock and mutated there;
//! new transfer, ledger and audit rows are staged. Nothing is visible to other
//! readers until [`Transaction::commit`] applies the whole working set in one
//! step. Dropping an unfinished transaction rolls it back.
//!
//! Locks are held until the transaction finishes (strict two-phase locking).

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::Arc;
use tracing::debug;

use super::database::{ChangeSet, Database};
use super::error::{StoreError, ACCOUNT_PRIMARY_KEY, NON_NEGATIVE_BALANCE, TRANSFER_REFERENCE_KEY};
use super::lock_manager::{LockKey, RowLock, TxId};
use crate::types::{Account, AccountId, AccountStatus, AuditLog, LedgerEntry, Transfer};

#[derive(Debug)]
pub struct Transaction {
    id: TxId,
    db: Arc<Database>,
    locks: HashMap<LockKey, RowLock>,

    /// Working copies of account rows read or written by this transaction
    accounts: HashMap<AccountId, Account>,
    dirty: HashSet<AccountId>,

    transfers: Vec<Transfer>,
    ledger_entries: Vec<LedgerEntry>,
    audit_logs: Vec<AuditLog>,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(id: TxId, db: Arc<Database>) -> Self {
        Self {
            id,
            db,
            locks: HashMap::new(),
            accounts: HashMap::new(),
            dirty: HashSet::new(),
            transfers: Vec::new(),
            ledger_entries: Vec::new(),
            audit_logs: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    /// Take an exclusive lock on `key` unless this transaction already holds it
    pub async fn lock(&mut self, key: LockKey) -> Result<(), StoreError> {
        if self.locks.contains_key(&key) {
            return Ok(());
        }
        let lock = self.db.locks().acquire(self.id, key.clone()).await?;
        self.locks.insert(key, lock);
        Ok(())
    }

    /// Lock an account row and read it (`SELECT ... FOR UPDATE`)
    ///
    /// Returns `None` if no such account exists.
    pub async fn select_account_for_update(
        &mut self,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        self.lock(LockKey::Account(id)).await?;
        Ok(self.select_account(&id))
    }

    /// Read an account as this transaction sees it, without locking
    pub fn select_account(&self, id: &AccountId) -> Option<Account> {
        self.accounts
            .get(id)
            .cloned()
            .or_else(|| self.db.account(id))
    }

    /// Add deltas to both balance columns of an account
    ///
    /// Takes the row lock if not already held. Fails with `CheckViolation` if
    /// either balance would go negative.
    pub async fn update_account_balances(
        &mut self,
        id: AccountId,
        available_delta: Decimal,
        ledger_delta: Decimal,
    ) -> Result<Account, StoreError> {
        let mut account = self.locked_row(id).await?;

        let overflow = || StoreError::NumericOverflow { account_id: id };
        let available = account
            .available_balance
            .checked_add(available_delta)
            .ok_or_else(overflow)?;
        let ledger = account
            .ledger_balance
            .checked_add(ledger_delta)
            .ok_or_else(overflow)?;

        if available < Decimal::ZERO || ledger < Decimal::ZERO {
            return Err(StoreError::CheckViolation {
                constraint: NON_NEGATIVE_BALANCE,
                account_id: id,
            });
        }

        account.available_balance = available;
        account.ledger_balance = ledger;
        account.updated_at = Utc::now();
        Ok(self.stage_account(account))
    }

    /// Set the status of an account; `None` if it does not exist
    pub async fn update_account_status(
        &mut self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Option<Account>, StoreError> {
        let Some(mut account) = self.select_account_for_update(id).await? else {
            return Ok(None);
        };
        account.status = status;
        account.updated_at = Utc::now();
        Ok(Some(self.stage_account(account)))
    }

    pub async fn insert_account(&mut self, account: Account) -> Result<Account, StoreError> {
        self.lock(LockKey::Account(account.id)).await?;
        if self.select_account(&account.id).is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: ACCOUNT_PRIMARY_KEY,
                value: account.id.to_string(),
            });
        }
        Ok(self.stage_account(account))
    }

    /// Stage a transfer row, enforcing the unique index on its reference
    ///
    /// If another open transaction is inserting the same reference, this
    /// waits for it to finish; once it has committed the insert fails with
    /// `UniqueViolation`.
    pub async fn insert_transfer(&mut self, transfer: Transfer) -> Result<Transfer, StoreError> {
        self.lock(LockKey::Reference(transfer.reference.clone()))
            .await?;

        let staged = self
            .transfers
            .iter()
            .any(|existing| existing.reference == transfer.reference);
        if staged || self.db.reference_exists(&transfer.reference) {
            return Err(StoreError::UniqueViolation {
                constraint: TRANSFER_REFERENCE_KEY,
                value: transfer.reference,
            });
        }

        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    pub fn insert_ledger_entries(&mut self, entries: impl IntoIterator<Item = LedgerEntry>) {
        self.ledger_entries.extend(entries);
    }

    pub fn insert_audit_log(&mut self, audit: AuditLog) {
        self.audit_logs.push(audit);
    }

    /// Apply every staged row atomically, then release all locks
    pub fn commit(mut self) -> Result<(), StoreError> {
        let accounts = mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.accounts.remove(&id))
            .collect();
        let changes = ChangeSet {
            accounts,
            transfers: mem::take(&mut self.transfers),
            ledger_entries: mem::take(&mut self.ledger_entries),
            audit_logs: mem::take(&mut self.audit_logs),
        };

        // mark finished first so a failed apply is not logged twice
        self.finished = true;
        self.db.apply(changes)?;
        debug!(tx = self.id, "Transaction committed");
        Ok(())
    }

    /// Discard every staged row and release all locks
    pub fn rollback(mut self) {
        self.finished = true;
        debug!(tx = self.id, "Transaction rolled back");
    }

    async fn locked_row(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.select_account_for_update(id)
            .await?
            .ok_or(StoreError::RowNotFound { account_id: id })
    }

    fn stage_account(&mut self, account: Account) -> Account {
        self.dirty.insert(account.id);
        self.accounts.insert(account.id, account.clone());
        account
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(tx = self.id, "Transaction dropped without commit, rolling back");
        }
        self.db.locks().forget(self.id);
    }
}
