//! Row-level exclusive locks with deadlock detection
//!
//! Each lockable row (an account, or a transfer reference in the unique
//! index) has its own async mutex. A transaction that has to wait registers a
//! wait-for edge and walks the wait-for graph; if the walk comes back to the
//! waiter, the youngest transaction in the cycle is chosen as the victim and
//! fails with [`StoreError::Deadlock`].
//!
//! Waiters repeat the check every `deadlock_check_interval`, so a cycle closed
//! by two registrations racing each other is still found on the next tick.
//!
//! # Thread Safety
//!
//! The wait-for graph lives in `DashMap`s. Entries are cloned out before the
//! next lookup so no shard lock is held across a graph step.

use dashmap::{DashMap, DashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::error::StoreError;
use crate::types::AccountId;

/// Transaction identifier; higher ids are younger transactions
pub type TxId = u64;

/// Something a transaction can hold an exclusive lock on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// An account row (`SELECT ... FOR UPDATE` / `UPDATE`)
    Account(AccountId),
    /// An entry of the unique index on transfer references
    Reference(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Account(id) => write!(f, "account {}", id),
            LockKey::Reference(reference) => write!(f, "reference {}", reference),
        }
    }
}

/// Lock table shared by all transactions of one database
#[derive(Debug)]
pub struct LockManager {
    /// One mutex per key that is held or waited on
    slots: DashMap<LockKey, Arc<Mutex<()>>>,

    /// Current holder of each held key
    owners: DashMap<LockKey, TxId>,

    /// Key each blocked transaction is waiting for
    waits: DashMap<TxId, LockKey>,

    /// Transactions chosen as deadlock victims by another waiter
    victims: DashSet<TxId>,

    check_interval: Duration,
    lock_timeout: Option<Duration>,
}

impl LockManager {
    pub fn new(check_interval: Duration, lock_timeout: Option<Duration>) -> Self {
        Self {
            slots: DashMap::new(),
            owners: DashMap::new(),
            waits: DashMap::new(),
            victims: DashSet::new(),
            check_interval,
            lock_timeout,
        }
    }

    /// Acquire an exclusive lock on `key` for transaction `tx`
    ///
    /// Blocks until the current holder releases the key. Fails with
    /// `Deadlock` when `tx` is picked as a deadlock victim and with
    /// `LockTimeout` when a lock timeout is configured and exceeded.
    pub async fn acquire(self: &Arc<Self>, tx: TxId, key: LockKey) -> Result<RowLock, StoreError> {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        if let Ok(guard) = Arc::clone(&slot).try_lock_owned() {
            return Ok(self.grant(tx, key, guard));
        }

        self.waits.insert(tx, key.clone());
        debug!(tx, %key, "Waiting for row lock");

        let started = Instant::now();
        let wait = slot.lock_owned();
        tokio::pin!(wait);

        let outcome = loop {
            if let Err(err) = self.check_deadlock(tx, &key) {
                break Err(err);
            }
            if let Some(limit) = self.lock_timeout {
                if started.elapsed() >= limit {
                    let waited_ms = started.elapsed().as_millis() as u64;
                    warn!(tx, %key, waited_ms, "Lock wait timeout");
                    break Err(StoreError::LockTimeout {
                        key: key.clone(),
                        waited_ms,
                    });
                }
            }
            match tokio::time::timeout(self.check_interval, &mut wait).await {
                Ok(guard) => break Ok(guard),
                Err(_elapsed) => continue,
            }
        };

        self.waits.remove(&tx);
        self.victims.remove(&tx);
        outcome.map(|guard| self.grant(tx, key, guard))
    }

    /// Transaction currently holding `key`, if any
    pub fn holder(&self, key: &LockKey) -> Option<TxId> {
        self.owners.get(key).map(|owner| *owner)
    }

    /// Number of transactions blocked on `key`
    pub fn waiters(&self, key: &LockKey) -> usize {
        self.waits.iter().filter(|entry| entry.value() == key).count()
    }

    /// Number of keys with a live mutex
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Drop any bookkeeping left for a finished transaction
    pub fn forget(&self, tx: TxId) {
        self.waits.remove(&tx);
        self.victims.remove(&tx);
    }

    fn grant(self: &Arc<Self>, tx: TxId, key: LockKey, guard: OwnedMutexGuard<()>) -> RowLock {
        self.owners.insert(key.clone(), tx);
        self.victims.remove(&tx);
        RowLock {
            key,
            tx,
            manager: Arc::clone(self),
            _guard: guard,
        }
    }

    fn check_deadlock(&self, tx: TxId, key: &LockKey) -> Result<(), StoreError> {
        let deadlock = || StoreError::Deadlock {
            tx,
            key: key.clone(),
        };

        if self.victims.remove(&tx).is_some() {
            warn!(tx, %key, "Aborting deadlock victim");
            return Err(deadlock());
        }

        if let Some(cycle) = self.find_cycle(tx) {
            let victim = cycle.iter().copied().max().unwrap_or(tx);
            if victim == tx {
                warn!(tx, %key, ?cycle, "Deadlock detected, aborting waiter");
                return Err(deadlock());
            }
            debug!(tx, victim, ?cycle, "Deadlock detected, marking younger transaction");
            self.victims.insert(victim);
        }

        Ok(())
    }

    /// Follow wait-for edges from `start`; returns the cycle if it closes on `start`
    fn find_cycle(&self, start: TxId) -> Option<Vec<TxId>> {
        let mut path = vec![start];
        let mut current = start;

        loop {
            let key = self.waits.get(&current).map(|key| key.clone())?;
            let owner = self.owners.get(&key).map(|owner| *owner)?;
            if owner == start {
                return Some(path);
            }
            if path.contains(&owner) {
                // cycle that does not include `start`; one of its members reports it
                return None;
            }
            path.push(owner);
            current = owner;
        }
    }
}

/// A held row lock; released on drop
#[derive(Debug)]
pub struct RowLock {
    key: LockKey,
    tx: TxId,
    manager: Arc<LockManager>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for RowLock {
    fn drop(&mut self) {
        // ownership is cleared before the guard field is dropped
        let tx = self.tx;
        self.manager.owners.remove_if(&self.key, |_, owner| *owner == tx);

        // map + this guard only: nobody waits, so the slot can go. Acquirers
        // clone the slot under the same shard lock, so none can sneak in.
        self.manager
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<LockManager> {
        Arc::new(LockManager::new(Duration::from_millis(5), None))
    }

    fn account_key() -> LockKey {
        LockKey::Account(AccountId::new_v4())
    }

    async fn wait_for_waiter(manager: &LockManager, key: &LockKey) {
        while manager.waiters(key) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let manager = manager();
        let key = account_key();

        let lock = manager.acquire(1, key.clone()).await.unwrap();
        assert_eq!(manager.holder(&key), Some(1));
        assert_eq!(manager.slot_count(), 1);

        drop(lock);
        assert_eq!(manager.holder(&key), None);
        assert_eq!(manager.slot_count(), 0);

        let _again = manager.acquire(2, key.clone()).await.unwrap();
        assert_eq!(manager.holder(&key), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiter_gets_lock_after_release() {
        let manager = manager();
        let key = account_key();

        let first = manager.acquire(1, key.clone()).await.unwrap();

        let waiter = {
            let manager = Arc::clone(&manager);
            let key = key.clone();
            tokio::spawn(async move { manager.acquire(2, key).await.map(|_lock| ()) })
        };

        wait_for_waiter(&manager, &key).await;
        assert_eq!(manager.holder(&key), Some(1));

        // the waiter still needs the slot, so releasing does not remove it
        drop(first);
        waiter.await.unwrap().unwrap();
        assert_eq!(manager.waiters(&key), 0);
        assert_eq!(manager.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_slots_do_not_accumulate() {
        let manager = manager();

        for tx in 1..=1000 {
            let key = LockKey::Reference(format!("ref-{}", tx));
            let _lock = manager.acquire(tx, key).await.unwrap();
        }

        assert_eq!(manager.slot_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_opposite_order_deadlock_aborts_youngest() {
        let manager = manager();
        let key_a = account_key();
        let key_b = account_key();

        // tx 1 (older) holds A, tx 2 (younger) holds B
        let _held_a = manager.acquire(1, key_a.clone()).await.unwrap();
        let held_b = manager.acquire(2, key_b.clone()).await.unwrap();

        // tx 2 waits for A
        let younger = {
            let manager = Arc::clone(&manager);
            let key_a = key_a.clone();
            tokio::spawn(async move {
                let result = manager.acquire(2, key_a).await.map(|_lock| ());
                drop(held_b);
                result
            })
        };
        wait_for_waiter(&manager, &key_a).await;

        // tx 1 closes the cycle by waiting for B; tx 2 is younger and is aborted
        let older = manager.acquire(1, key_b.clone()).await;

        let younger_result = younger.await.unwrap();
        assert!(matches!(
            younger_result,
            Err(StoreError::Deadlock { tx: 2, .. })
        ));
        assert!(older.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiter_closing_cycle_as_youngest_aborts_itself() {
        let manager = manager();
        let key_a = account_key();
        let key_b = account_key();

        let held_a = manager.acquire(1, key_a.clone()).await.unwrap();
        let held_b = manager.acquire(2, key_b.clone()).await.unwrap();

        // tx 1 waits for B
        let older = {
            let manager = Arc::clone(&manager);
            let key_b = key_b.clone();
            tokio::spawn(async move {
                let result = manager.acquire(1, key_b).await.map(|_lock| ());
                drop(held_a);
                result
            })
        };
        wait_for_waiter(&manager, &key_b).await;

        // tx 2 closes the cycle and is itself the youngest
        let younger = manager.acquire(2, key_a.clone()).await;
        assert!(matches!(younger, Err(StoreError::Deadlock { tx: 2, .. })));

        drop(held_b);
        older.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_timeout() {
        let manager = Arc::new(LockManager::new(
            Duration::from_millis(5),
            Some(Duration::from_millis(30)),
        ));
        let key = account_key();

        let _held = manager.acquire(1, key.clone()).await.unwrap();
        let result = manager.acquire(2, key.clone()).await;

        assert!(matches!(result, Err(StoreError::LockTimeout { .. })));
        assert_eq!(manager.waiters(&key), 0);
        assert_eq!(manager.holder(&key), Some(1));
    }
}
