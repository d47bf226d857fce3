//! Test utilities for document store operations.
//!
//! Provides an in-memory [`DocumentStore`] double with call counting and
//! failure injection, so service tests can assert how often the remote was
//! consulted (backoff suppression) and how operations degrade when it
//! rejects access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use prepsync_common::{AppError, AppResult};
use serde_json::Value;

use crate::remote::DocumentStore;

/// Failure injected into every subsequent call until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// The store rejects the operation.
    PermissionDenied,
    /// The store cannot be reached.
    Unavailable,
}

impl InjectedFailure {
    fn to_error(self) -> AppError {
        match self {
            Self::PermissionDenied => AppError::PermissionDenied("injected".to_string()),
            Self::Unavailable => AppError::RemoteUnavailable("injected".to_string()),
        }
    }
}

/// In-memory document store for tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<InjectedFailure>>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    merge_calls: AtomicUsize,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn doc_key(collection: &str, key: &str) -> String {
        format!("{collection}/{key}")
    }

    /// Seed a document directly.
    pub fn insert(&self, collection: &str, key: &str, doc: Value) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(Self::doc_key(collection, key), doc);
        }
    }

    /// Inspect a stored document.
    #[must_use]
    pub fn document(&self, collection: &str, key: &str) -> Option<Value> {
        self.docs
            .lock()
            .ok()
            .and_then(|docs| docs.get(&Self::doc_key(collection, key)).cloned())
    }

    /// Make every subsequent call fail until [`Self::clear_failure`].
    pub fn fail_with(&self, failure: InjectedFailure) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(failure);
        }
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = None;
        }
    }

    /// Number of `get` calls observed.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `put` calls observed.
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `merge` calls observed.
    #[must_use]
    pub fn merge_calls(&self) -> usize {
        self.merge_calls.load(Ordering::SeqCst)
    }

    /// Total calls observed across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.get_calls() + self.put_calls() + self.merge_calls()
    }

    fn injected_error(&self) -> Option<AppError> {
        self.failure
            .lock()
            .ok()
            .and_then(|slot| slot.map(InjectedFailure::to_error))
    }

    fn locked_docs(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.docs
            .lock()
            .map_err(|_| AppError::Internal("document lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_error() {
            return Err(err);
        }
        Ok(self.locked_docs()?.get(&Self::doc_key(collection, key)).cloned())
    }

    async fn put(&self, collection: &str, key: &str, doc: &Value) -> AppResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_error() {
            return Err(err);
        }
        self.locked_docs()?
            .insert(Self::doc_key(collection, key), doc.clone());
        Ok(())
    }

    async fn merge(&self, collection: &str, key: &str, patch: &Value) -> AppResult<()> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_error() {
            return Err(err);
        }
        let mut docs = self.locked_docs()?;
        let entry = docs
            .entry(Self::doc_key(collection, key))
            .or_insert_with(|| Value::Object(serde_json::Map::new()));

        // Top-level field merge: patched fields replace, others survive.
        if let (Value::Object(existing), Value::Object(incoming)) = (entry, patch) {
            for (field, value) in incoming {
                existing.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }
}
