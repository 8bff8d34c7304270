//! Transaction Manager
//!
//! Handles transaction lifecycle (Begin, Commit, Rollback). Every transaction
//! pins one catalog snapshot at begin time; all catalog reads made by the
//! statements it runs observe that snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::catalog::{Catalog, CatalogState};
use crate::error::{Error, Result};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Isolation level reported by `SHOW TRANSACTION ISOLATION LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Serializable,
    Snapshot,
}

impl IsolationLevel {
    /// Parse a level name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SERIALIZABLE" => Some(IsolationLevel::Serializable),
            "SNAPSHOT" => Some(IsolationLevel::Snapshot),
            _ => None,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
            IsolationLevel::Snapshot => write!(f, "SNAPSHOT"),
        }
    }
}

/// Transaction priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl UserPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOW" => Some(UserPriority::Low),
            "NORMAL" => Some(UserPriority::Normal),
            "HIGH" => Some(UserPriority::High),
            _ => None,
        }
    }
}

impl fmt::Display for UserPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserPriority::Low => write!(f, "LOW"),
            UserPriority::Normal => write!(f, "NORMAL"),
            UserPriority::High => write!(f, "HIGH"),
        }
    }
}

/// A read failure armed on a transaction, see [`Transaction::inject_read_failure`]
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
struct ReadFault {
    remaining: usize,
    message: String,
}

/// Transaction Context
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    implicit: bool,
    snapshot: Arc<CatalogState>,
    state: Mutex<TransactionState>,
    isolation: Mutex<IsolationLevel>,
    priority: Mutex<UserPriority>,
    #[cfg(any(test, feature = "testing"))]
    fault: Mutex<Option<ReadFault>>,
}

impl Transaction {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Was this transaction opened by the engine for a single statement?
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn state(&self) -> TransactionState {
        *lock(&self.state)
    }

    pub fn isolation(&self) -> IsolationLevel {
        *lock(&self.isolation)
    }

    pub fn set_isolation(&self, level: IsolationLevel) {
        *lock(&self.isolation) = level;
    }

    pub fn priority(&self) -> UserPriority {
        *lock(&self.priority)
    }

    pub fn set_priority(&self, priority: UserPriority) {
        *lock(&self.priority) = priority;
    }

    /// The catalog snapshot pinned at begin
    pub fn snapshot(&self) -> Arc<CatalogState> {
        self.snapshot.clone()
    }

    /// Read the catalog through this transaction.
    ///
    /// Fails when the transaction is no longer active, or with
    /// [`Error::AmbiguousResult`] once an injected read failure fires.
    pub fn read(&self) -> Result<&CatalogState> {
        if self.state() != TransactionState::Active {
            return Err(Error::TransactionAborted(self.id));
        }
        self.fire_read_fault()?;
        trace!(txn = self.id, "catalog read");
        Ok(&self.snapshot)
    }

    #[cfg(any(test, feature = "testing"))]
    fn fire_read_fault(&self) -> Result<()> {
        if let Some(fault) = lock(&self.fault).as_mut() {
            if fault.remaining == 0 {
                return Err(Error::AmbiguousResult(fault.message.clone()));
            }
            fault.remaining -= 1;
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "testing")))]
    fn fire_read_fault(&self) -> Result<()> {
        Ok(())
    }

    /// Make every catalog read after the next `after` successful ones fail
    /// with an ambiguous result, the way a lost commit acknowledgement
    /// surfaces from a distributed transaction layer.
    #[cfg(any(test, feature = "testing"))]
    pub fn inject_read_failure(&self, after: usize, message: impl Into<String>) {
        *lock(&self.fault) = Some(ReadFault {
            remaining: after,
            message: message.into(),
        });
    }
}

/// Transaction Manager
pub struct TransactionManager {
    catalog: Arc<Catalog>,
    /// Active Transactions
    transactions: RwLock<HashMap<u64, Arc<Transaction>>>,
    /// Next Transaction ID
    next_trans_id: Mutex<u64>,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            transactions: RwLock::new(HashMap::new()),
            next_trans_id: Mutex::new(1),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Begin a new transaction on the current catalog
    pub fn begin(&self, implicit: bool, isolation: IsolationLevel) -> Arc<Transaction> {
        let id = {
            let mut next = lock(&self.next_trans_id);
            let id = *next;
            *next += 1;
            id
        };

        let txn = Arc::new(Transaction {
            id,
            implicit,
            snapshot: self.catalog.snapshot(),
            state: Mutex::new(TransactionState::Active),
            isolation: Mutex::new(isolation),
            priority: Mutex::new(UserPriority::default()),
            #[cfg(any(test, feature = "testing"))]
            fault: Mutex::new(None),
        });

        self.transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, txn.clone());
        debug!(txn = id, implicit, "transaction started");

        txn
    }

    /// Commit a transaction
    pub fn commit(&self, txn: &Transaction) -> Result<()> {
        self.finish(txn, TransactionState::Committed)?;
        debug!(txn = txn.id, "transaction committed");
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&self, txn: &Transaction) -> Result<()> {
        self.finish(txn, TransactionState::Aborted)?;
        debug!(txn = txn.id, "transaction rolled back");
        Ok(())
    }

    fn finish(&self, txn: &Transaction, outcome: TransactionState) -> Result<()> {
        {
            let mut state = lock(&txn.state);
            if *state != TransactionState::Active {
                return Err(Error::TransactionAborted(txn.id));
            }
            *state = outcome;
        }
        self.transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&txn.id);
        Ok(())
    }

    /// Check if transaction is active
    pub fn is_active(&self, trans_id: u64) -> bool {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&trans_id)
            .map(|t| t.state() == TransactionState::Active)
            .unwrap_or(false)
    }

    /// Number of transactions not yet committed or rolled back
    pub fn active_count(&self) -> usize {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let manager = TransactionManager::new(Arc::new(Catalog::new()));
        let txn = manager.begin(false, IsolationLevel::Serializable);
        assert!(manager.is_active(txn.id()));
        assert_eq!(manager.active_count(), 1);

        manager.commit(&txn).unwrap();
        assert!(!manager.is_active(txn.id()));
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(matches!(manager.commit(&txn), Err(Error::TransactionAborted(_))));
        assert!(matches!(txn.read(), Err(Error::TransactionAborted(_))));
    }

    #[test]
    fn test_snapshot_is_pinned() {
        let catalog = Arc::new(Catalog::new());
        let manager = TransactionManager::new(catalog.clone());
        let txn = manager.begin(true, IsolationLevel::Snapshot);
        catalog.create_database("late").unwrap();

        assert!(txn.read().unwrap().database("late").is_none());
        let next = manager.begin(true, IsolationLevel::Snapshot);
        assert!(next.read().unwrap().database("late").is_some());
    }

    #[test]
    fn test_injected_read_failure_is_ambiguous() {
        let manager = TransactionManager::new(Arc::new(Catalog::new()));
        let txn = manager.begin(false, IsolationLevel::Serializable);
        txn.inject_read_failure(1, "connection lost");

        assert!(txn.read().is_ok());
        let err = txn.read().unwrap_err();
        assert!(err.is_ambiguous());
        assert!(txn.read().unwrap_err().is_ambiguous());
    }

    #[test]
    fn test_modes() {
        assert_eq!(
            IsolationLevel::parse("snapshot"),
            Some(IsolationLevel::Snapshot)
        );
        assert_eq!(UserPriority::parse("High"), Some(UserPriority::High));
        assert_eq!(UserPriority::default().to_string(), "NORMAL");
        assert!(IsolationLevel::parse("chaos").is_none());
    }
}
