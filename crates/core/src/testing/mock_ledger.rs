//! Mock dedup ledger for testing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::ledger::{DedupLedger, LedgerError};

/// In-memory ledger with injectable failures.
///
/// The ledger trait is synchronous, so state sits behind a std `Mutex`.
#[derive(Debug, Default)]
pub struct MockLedger {
    processed: Arc<Mutex<HashSet<String>>>,
    /// Ids passed to `mark_processed`, in call order.
    marks: Arc<Mutex<Vec<String>>>,
    fail_exists: Arc<Mutex<bool>>,
    fail_mark: Arc<Mutex<bool>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an id as already processed.
    pub fn insert(&self, item_id: &str) {
        lock(&self.processed).insert(item_id.to_string());
    }

    pub fn marks(&self) -> Vec<String> {
        lock(&self.marks).clone()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        lock(&self.processed).contains(item_id)
    }

    /// Make `exists` fail until cleared.
    pub fn set_fail_exists(&self, fail: bool) {
        *lock(&self.fail_exists) = fail;
    }

    /// Make `mark_processed` fail until cleared.
    pub fn set_fail_mark(&self, fail: bool) {
        *lock(&self.fail_mark) = fail;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DedupLedger for MockLedger {
    fn exists(&self, item_id: &str) -> Result<bool, LedgerError> {
        if *lock(&self.fail_exists) {
            return Err(LedgerError::Database("mock exists failure".to_string()));
        }
        Ok(lock(&self.processed).contains(item_id))
    }

    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError> {
        lock(&self.marks).push(item_id.to_string());
        if *lock(&self.fail_mark) {
            return Err(LedgerError::Database("mock mark failure".to_string()));
        }
        lock(&self.processed).insert(item_id.to_string());
        Ok(())
    }
}
