//! Persistent property staging.
//!
//! Writes to persistent properties are serialized with `serde_json` and
//! staged; the runtime hands every staged entry to [`Storage::store_batch`]
//! once per checkpoint, so many writes in one tick cost one flush.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::property::PropertyValue;
use crate::error::BoxError;

/// Durable key/value backend.
pub trait Storage {
    /// Raw stored text for `key`.
    fn load(&self, key: &str) -> Option<String>;

    /// Write every entry in one batch.
    fn store_batch(&self, entries: &[(String, String)]) -> Result<(), BoxError>;
}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    entries: IndexMap<String, String>,
    batches: usize,
}

/// In-memory [`Storage`]. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryStorageInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw entry.
    pub fn insert(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.inner.borrow_mut().entries.insert(key.into(), raw.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `store_batch` calls so far.
    pub fn batch_count(&self) -> usize {
        self.inner.borrow().batches
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn store_batch(&self, entries: &[(String, String)]) -> Result<(), BoxError> {
        let mut inner = self.inner.borrow_mut();
        inner.batches += 1;
        for (key, raw) in entries {
            inner.entries.insert(key.clone(), raw.clone());
        }
        Ok(())
    }
}

/// Storage key for a property: `{prefix}{custom}` or `{prefix}{class}.{name}`.
pub fn storage_key(prefix: &str, class: &str, name: &str, custom: Option<&str>) -> String {
    match custom {
        Some(key) => format!("{prefix}{key}"),
        None => format!("{prefix}{class}.{name}"),
    }
}

/// Decode a stored value, falling back to `initial` on bad data.
pub(crate) fn decode(key: &str, raw: &str, initial: &PropertyValue) -> PropertyValue {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring unreadable stored value");
            initial.clone()
        }
    }
}

/// Entries waiting for the next checkpoint. Later writes to a key replace
/// earlier ones.
#[derive(Debug, Default)]
pub(crate) struct PersistenceQueue {
    staged: IndexMap<String, String>,
}

impl PersistenceQueue {
    pub(crate) fn stage(&mut self, key: String, value: &PropertyValue) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_string(value)?;
        self.staged.insert(key, raw);
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.staged).into_iter().collect()
    }

    /// Put back a batch the backend rejected. Values staged since the batch
    /// was taken are newer and win.
    pub(crate) fn restore(&mut self, entries: Vec<(String, String)>) {
        for (key, raw) in entries {
            self.staged.entry(key).or_insert(raw);
        }
    }
}
