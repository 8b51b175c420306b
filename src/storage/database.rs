//! Committed tables of the in-process storage engine
//!
//! `Database` owns the committed rows of the four tables and the lock
//! manager. Writes only happen through [`Transaction`]s; readers see
//! committed state only.
//!
//! # Architecture
//!
//! ```text
//! Database
//!     ├── accounts           DashMap<AccountId, Account>
//!     ├── transfers          DashMap<TransferId, Sequenced<Transfer>>
//!     ├── transfer_refs      DashMap<String, TransferId>   (unique index)
//!     ├── ledger_entries     DashMap<Uuid, Sequenced<LedgerEntry>>
//!     ├── audit_logs         DashMap<Uuid, Sequenced<AuditLog>>
//!     └── Arc<LockManager>   (row locks + deadlock detection)
//! ```
//!
//! # Atomic visibility
//!
//! A commit applies its rows under the write side of `commit_gate`. Scans
//! that must not observe half of a commit (listing accounts, listing rows by
//! account) take the read side.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use super::error::{StoreError, TRANSFER_REFERENCE_KEY};
use super::lock_manager::LockManager;
use super::transaction::Transaction;
use crate::config::StoreConfig;
use crate::types::{Account, AccountId, AuditLog, LedgerEntry, Transfer, TransferId};

/// A committed row tagged with its commit sequence number
///
/// Sequence numbers grow with commit order and give newest-first listings a
/// stable order even when timestamps collide.
#[derive(Debug, Clone)]
pub struct Sequenced<T> {
    pub seq: u64,
    pub row: T,
}

/// Rows staged by a transaction, applied together on commit
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    pub accounts: Vec<Account>,
    pub transfers: Vec<Transfer>,
    pub ledger_entries: Vec<LedgerEntry>,
    pub audit_logs: Vec<AuditLog>,
}

#[derive(Debug)]
pub struct Database {
    accounts: DashMap<AccountId, Account>,
    transfers: DashMap<TransferId, Sequenced<Transfer>>,
    transfer_refs: DashMap<String, TransferId>,
    ledger_entries: DashMap<Uuid, Sequenced<LedgerEntry>>,
    audit_logs: DashMap<Uuid, Sequenced<AuditLog>>,
    locks: Arc<LockManager>,
    commit_gate: RwLock<()>,
    next_tx_id: AtomicU64,
    next_seq: AtomicU64,
    config: StoreConfig,
}

impl Database {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            transfers: DashMap::new(),
            transfer_refs: DashMap::new(),
            ledger_entries: DashMap::new(),
            audit_logs: DashMap::new(),
            locks: Arc::new(LockManager::new(
                config.deadlock_check_interval,
                config.lock_timeout,
            )),
            commit_gate: RwLock::new(()),
            next_tx_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(1),
            config,
        }
    }

    /// Open a new transaction
    pub fn begin(self: &Arc<Self>) -> Transaction {
        let id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        Transaction::new(id, Arc::clone(self))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    // ----- committed reads -------------------------------------------------

    pub fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).map(|account| account.clone())
    }

    /// All accounts, as of one consistent point between commits
    pub fn accounts(&self) -> Vec<Account> {
        let _gate = self.commit_gate.read().unwrap_or_else(PoisonError::into_inner);
        self.accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn transfer(&self, id: &TransferId) -> Option<Transfer> {
        self.transfers.get(id).map(|entry| entry.row.clone())
    }

    pub fn transfer_by_reference(&self, reference: &str) -> Option<Transfer> {
        let id = self.transfer_refs.get(reference).map(|id| *id)?;
        self.transfer(&id)
    }

    /// Transfers matching `filter`, newest first
    pub fn transfers_where(&self, filter: impl Fn(&Transfer) -> bool) -> Vec<Transfer> {
        let _gate = self.commit_gate.read().unwrap_or_else(PoisonError::into_inner);
        newest_first(self.transfers.iter().map(|entry| entry.value().clone()), filter)
    }

    /// Ledger entries matching `filter`, newest first
    pub fn ledger_entries_where(&self, filter: impl Fn(&LedgerEntry) -> bool) -> Vec<LedgerEntry> {
        let _gate = self.commit_gate.read().unwrap_or_else(PoisonError::into_inner);
        newest_first(
            self.ledger_entries.iter().map(|entry| entry.value().clone()),
            filter,
        )
    }

    /// Audit rows matching `filter`, newest first
    pub fn audit_logs_where(&self, filter: impl Fn(&AuditLog) -> bool) -> Vec<AuditLog> {
        let _gate = self.commit_gate.read().unwrap_or_else(PoisonError::into_inner);
        newest_first(self.audit_logs.iter().map(|entry| entry.value().clone()), filter)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn ledger_entry_count(&self) -> usize {
        self.ledger_entries.len()
    }

    pub fn audit_log_count(&self) -> usize {
        self.audit_logs.len()
    }

    // ----- commit ----------------------------------------------------------

    /// Apply a transaction's staged rows atomically
    ///
    /// Constraints are checked before anything is written, so a failing
    /// commit leaves every table untouched.
    pub(crate) fn apply(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let _gate = self.commit_gate.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(duplicate) = changes
            .transfers
            .iter()
            .find(|transfer| self.transfer_refs.contains_key(&transfer.reference))
        {
            return Err(StoreError::UniqueViolation {
                constraint: TRANSFER_REFERENCE_KEY,
                value: duplicate.reference.clone(),
            });
        }

        for account in changes.accounts {
            self.accounts.insert(account.id, account);
        }
        for transfer in changes.transfers {
            // row before index entry: a reference hit always resolves to a row
            let seq = self.next_seq();
            let (id, reference) = (transfer.id, transfer.reference.clone());
            self.transfers.insert(id, Sequenced { seq, row: transfer });
            self.transfer_refs.insert(reference, id);
        }
        for entry in changes.ledger_entries {
            let seq = self.next_seq();
            self.ledger_entries
                .insert(entry.id, Sequenced { seq, row: entry });
        }
        for audit in changes.audit_logs {
            let seq = self.next_seq();
            self.audit_logs.insert(audit.id, Sequenced { seq, row: audit });
        }

        Ok(())
    }

    pub(crate) fn reference_exists(&self, reference: &str) -> bool {
        self.transfer_refs.contains_key(reference)
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn newest_first<T>(rows: impl Iterator<Item = Sequenced<T>>, filter: impl Fn(&T) -> bool) -> Vec<T> {
    let mut matching: Vec<Sequenced<T>> = rows.filter(|entry| filter(&entry.row)).collect();
    matching.sort_by(|a, b| b.seq.cmp(&a.seq));
    matching.into_iter().map(|entry| entry.row).collect()
}
