//! Transfer store
//!
//! Append-only writer and read paths for completed transfers. The store
//! enforces nothing beyond the unique index on `reference`; every business
//! rule lives in the transfer engine.

use chrono::Utc;
use std::sync::Arc;

use crate::storage::{Database, StoreError, Transaction};
use crate::types::{
    AccountId, Page, Pagination, Transfer, TransferId, TransferRequest, TransferStatus,
};

#[derive(Debug, Clone)]
pub struct TransferStore {
    db: Arc<Database>,
}

impl TransferStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stage a COMPLETED transfer for `request` inside `tx`
    ///
    /// Fails with `StoreError::UniqueViolation` if the reference is already
    /// taken, possibly after waiting for a concurrent inserter to commit.
    pub async fn create(
        &self,
        tx: &mut Transaction,
        request: &TransferRequest,
    ) -> Result<Transfer, StoreError> {
        let transfer = Transfer {
            id: TransferId::new_v4(),
            source_account_id: request.source_account_id,
            destination_account_id: request.destination_account_id,
            amount: request.amount,
            currency: request.currency.clone(),
            reference: request.reference.clone(),
            status: TransferStatus::Completed,
            created_at: Utc::now(),
        };
        tx.insert_transfer(transfer).await
    }

    pub fn find_by_id(&self, id: &TransferId) -> Option<Transfer> {
        self.db.transfer(id)
    }

    pub fn find_by_reference(&self, reference: &str) -> Option<Transfer> {
        self.db.transfer_by_reference(reference)
    }

    /// Transfers where the account is source or destination, newest first
    pub fn list_by_account(&self, account_id: &AccountId, pagination: Pagination) -> Page<Transfer> {
        let rows = self.db.transfers_where(|transfer| {
            transfer.source_account_id == *account_id
                || transfer.destination_account_id == *account_id
        });
        Page::from_sorted(rows, pagination)
    }

    pub fn count(&self) -> usize {
        self.db.transfer_count()
    }
}
