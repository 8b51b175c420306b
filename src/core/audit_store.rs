//! Audit store
//!
//! One before/after balance snapshot per completed transfer. Written in the
//! same commit as the transfer; read only for reconciliation.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::storage::{Database, Transaction};
use crate::types::{AuditLog, Transfer, TransferId, SYSTEM_USER};

/// Balances of both accounts around a transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSnapshot {
    pub source_before: Decimal,
    pub source_after: Decimal,
    pub destination_before: Decimal,
    pub destination_after: Decimal,
}

#[derive(Debug, Clone)]
pub struct AuditStore {
    db: Arc<Database>,
}

impl AuditStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stage the audit row for `transfer` in `tx`
    pub fn create(
        &self,
        tx: &mut Transaction,
        transfer: &Transfer,
        balances: BalanceSnapshot,
    ) -> AuditLog {
        let audit = AuditLog {
            id: Uuid::new_v4(),
            user_id: SYSTEM_USER.to_string(),
            transfer_id: transfer.id,
            reference: transfer.reference.clone(),
            source_account_id: transfer.source_account_id,
            destination_account_id: transfer.destination_account_id,
            amount: transfer.amount,
            currency: transfer.currency.clone(),
            balance_source_before: balances.source_before,
            balance_source_after: balances.source_after,
            balance_dest_before: balances.destination_before,
            balance_dest_after: balances.destination_after,
            created_at: Utc::now(),
        };
        tx.insert_audit_log(audit.clone());
        audit
    }

    pub fn find_by_transfer_id(&self, transfer_id: &TransferId) -> Option<AuditLog> {
        self.db
            .audit_logs_where(|audit| audit.transfer_id == *transfer_id)
            .into_iter()
            .next()
    }

    pub fn count(&self) -> usize {
        self.db.audit_log_count()
    }
}
