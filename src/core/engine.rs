//! Transfer execution
//!
//! This module provides the `TransferEngine` struct, which moves money between
//! two accounts with exactly-once semantics under concurrent load.
//!
//! # Design
//!
//! One call to [`TransferEngine::execute_transfer`] runs:
//! 1. request validation and the same-account check
//! 2. an idempotency pre-check by reference
//! 3. up to [`MAX_TRANSFER_ATTEMPTS`] transactional attempts, each of which
//!    locks both accounts in ascending id order, validates the business rules,
//!    writes the transfer, both balance deltas, two ledger legs and an audit
//!    row, and commits
//!
//! Deadlock victims are retried with a fresh transaction. A unique violation
//! on the reference means a concurrent request with the same reference won
//! the race; the engine re-reads the winner and either returns it or reports
//! an idempotency conflict.
//!
//! # Architecture
//!
//! ```text
//! TransferEngine
//!     ├── Arc<Database>   (transactions)
//!     ├── AccountStore    (locked reads, balance deltas)
//!     ├── TransferStore   (unique reference)
//!     ├── LedgerStore     (DEBIT/CREDIT legs)
//!     └── AuditStore      (balance snapshots)
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone and is shared across tasks. It holds no state
//! of its own; all mutual exclusion comes from the storage engine's row locks.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::account_store::AccountStore;
use super::audit_store::{AuditStore, BalanceSnapshot};
use super::ledger_store::LedgerStore;
use super::retry::{run_with_deadlock_retry, MAX_TRANSFER_ATTEMPTS};
use super::transfer_store::TransferStore;
use crate::storage::{Database, Transaction};
use crate::types::{
    Account, AccountId, LedgerEntry, Transfer, TransferError, TransferRequest, TransferResult,
};

#[derive(Debug, Clone)]
pub struct TransferEngine {
    db: Arc<Database>,
    accounts: AccountStore,
    transfers: TransferStore,
    ledger: LedgerStore,
    audit: AuditStore,
}

impl TransferEngine {
    /// Create an engine over `db`
    ///
    /// # Arguments
    ///
    /// * `db` - Shared storage engine; the engine and its stores all write
    ///   through transactions opened on it
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            accounts: AccountStore::new(Arc::clone(&db)),
            transfers: TransferStore::new(Arc::clone(&db)),
            ledger: LedgerStore::new(Arc::clone(&db)),
            audit: AuditStore::new(Arc::clone(&db)),
            db,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn transfers(&self) -> &TransferStore {
        &self.transfers
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditStore {
        &self.audit
    }

    /// Execute one logical transfer
    ///
    /// Safe to call any number of times with the same request: the first
    /// successful call creates the transfer, later calls return it unchanged.
    ///
    /// # Arguments
    ///
    /// * `request` - Accounts, amount, currency and idempotency reference
    ///
    /// # Returns
    ///
    /// * `Ok(TransferResult)` - The new transfer, or the existing one for a
    ///   repeated reference with an identical body
    /// * `Err(TransferError::Validation)` - Malformed request
    /// * `Err(TransferError::SameAccount)` - Source equals destination
    /// * `Err(TransferError::IdempotencyConflict)` - Reference already used
    ///   for a different transfer
    /// * `Err(TransferError::AccountNotFound)` / `AccountNotActive` /
    ///   `CurrencyMismatch` / `InsufficientBalance` - Business rule violated;
    ///   nothing was written
    /// * `Err(TransferError::Store)` - Storage failure, including a deadlock
    ///   on every attempt
    #[instrument(
        skip(self, request),
        fields(
            reference = %request.reference,
            source = %request.source_account_id,
            destination = %request.destination_account_id,
        )
    )]
    pub async fn execute_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferResult, TransferError> {
        request.validate()?;
        if request.source_account_id == request.destination_account_id {
            return Err(TransferError::SameAccount);
        }

        if let Some(existing) = self.find_previous(&request)? {
            info!(transfer_id = %existing.id, "Idempotent replay, returning existing transfer");
            return Ok(existing.into());
        }

        let outcome = run_with_deadlock_retry(MAX_TRANSFER_ATTEMPTS, |attempt| {
            self.attempt_transfer(&request, attempt)
        })
        .await;

        match outcome {
            Ok(transfer) => {
                info!(
                    transfer_id = %transfer.id,
                    amount = %transfer.amount,
                    currency = %transfer.currency,
                    "Transfer completed"
                );
                Ok(transfer.into())
            }
            Err(err) if err.is_reference_conflict() => self.resolve_reference_race(&request, err),
            Err(err) => Err(err),
        }
    }

    /// Look up a stored transfer for the request's reference
    ///
    /// # Returns
    ///
    /// * `Ok(Some(transfer))` - Same reference with a matching body
    /// * `Ok(None)` - Reference not used yet
    /// * `Err(TransferError::IdempotencyConflict)` - Reference used with a
    ///   different body
    fn find_previous(&self, request: &TransferRequest) -> Result<Option<Transfer>, TransferError> {
        match self.transfers.find_by_reference(&request.reference) {
            Some(existing) if request.matches(&existing) => Ok(Some(existing)),
            Some(existing) => {
                warn!(existing_id = %existing.id, "Reference reused with a different body");
                Err(TransferError::idempotency_conflict(&request.reference))
            }
            None => Ok(None),
        }
    }

    /// Settle a lost race on the reference unique index
    fn resolve_reference_race(
        &self,
        request: &TransferRequest,
        err: TransferError,
    ) -> Result<TransferResult, TransferError> {
        debug!(error = %err, "Reference taken concurrently, re-checking");
        match self.find_previous(request)? {
            Some(winner) => {
                info!(transfer_id = %winner.id, "Concurrent duplicate resolved to existing transfer");
                Ok(winner.into())
            }
            None => Err(err),
        }
    }

    async fn attempt_transfer(
        &self,
        request: &TransferRequest,
        attempt: u32,
    ) -> Result<Transfer, TransferError> {
        let mut tx = self.db.begin();
        debug!(attempt, tx = tx.id(), "Transfer attempt started");

        match self.apply_transfer(&mut tx, request).await {
            Ok(transfer) => {
                tx.commit()?;
                Ok(transfer)
            }
            Err(err) => {
                debug!(attempt, tx = tx.id(), error = %err, "Transfer attempt failed");
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Everything one attempt writes, inside `tx`
    async fn apply_transfer(
        &self,
        tx: &mut Transaction,
        request: &TransferRequest,
    ) -> Result<Transfer, TransferError> {
        let source_id = request.source_account_id;
        let destination_id = request.destination_account_id;

        let [first, second] = lock_order(source_id, destination_id);
        let first_row = self.accounts.find_by_id_for_update(tx, first).await?;
        let second_row = self.accounts.find_by_id_for_update(tx, second).await?;
        let (source, destination) = if first == source_id {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        let source = source.ok_or_else(|| TransferError::account_not_found(source_id))?;
        let destination =
            destination.ok_or_else(|| TransferError::account_not_found(destination_id))?;

        check_transfer_rules(&source, &destination, request)?;

        let transfer = self.transfers.create(tx, request).await?;

        let amount = request.amount;
        let source_after = self
            .accounts
            .update_balances(tx, source_id, -amount, -amount)
            .await?;
        let destination_after = self
            .accounts
            .update_balances(tx, destination_id, amount, amount)
            .await?;

        self.ledger.create_many(
            tx,
            vec![
                LedgerEntry::debit(
                    transfer.id,
                    source_id,
                    amount,
                    source_after.available_balance,
                ),
                LedgerEntry::credit(
                    transfer.id,
                    destination_id,
                    amount,
                    destination_after.available_balance,
                ),
            ],
        );

        self.audit.create(
            tx,
            &transfer,
            BalanceSnapshot {
                source_before: source.available_balance,
                source_after: source_after.available_balance,
                destination_before: destination.available_balance,
                destination_after: destination_after.available_balance,
            },
        );

        Ok(transfer)
    }
}

/// Order in which the two accounts of a transfer are locked
///
/// Ascending by id, independent of which side is the source. Every
/// transaction locking the same pair uses the same order.
pub fn lock_order(a: AccountId, b: AccountId) -> [AccountId; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Business rules, checked in order: both ACTIVE, currencies, balance
fn check_transfer_rules(
    source: &Account,
    destination: &Account,
    request: &TransferRequest,
) -> Result<(), TransferError> {
    for account in [source, destination] {
        if !account.is_active() {
            return Err(TransferError::account_not_active(account.id, account.status));
        }
    }

    if source.currency != request.currency || destination.currency != request.currency {
        return Err(TransferError::currency_mismatch(
            &request.currency,
            &source.currency,
            &destination.currency,
        ));
    }

    if source.available_balance < request.amount {
        return Err(TransferError::insufficient_balance(
            source.id,
            source.available_balance,
            request.amount,
        ));
    }

    Ok(())
}
