//! In-memory settings store.
//!
//! [`MemorySettings`] is a cheap, cloneable handle: every clone shares the
//! same underlying map.  A test keeps one clone for inspection and hands
//! another to the code under test, then uses [`MemorySettings::replace_external`]
//! to simulate an edit made by someone else (which fires change callbacks).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use super::{ChangeCallback, SettingsStore, StoreError, Watchers};

#[derive(Debug)]
struct Inner {
    values: Map<String, Value>,
    watchers: Watchers,
    saves: usize,
    failing_saves: usize,
    available: bool,
}

/// Shared in-memory [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct MemorySettings {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySettings {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    /// Creates a store pre-populated with `values`.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                values,
                watchers: Watchers::default(),
                saves: 0,
                failing_saves: 0,
                available: true,
            })),
        }
    }

    /// Creates a store from a JSON value.  Anything other than an object
    /// yields an empty store.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current contents.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().values.clone()
    }

    /// Returns the number of successful [`save`](SettingsStore::save) calls.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Returns the number of registered change callbacks.
    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    /// Marks the store as (un)available.  While unavailable, `refresh` and
    /// `save` fail with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Makes the next `count` saves fail with [`StoreError::Unavailable`]
    /// while reads keep working.
    pub fn fail_next_saves(&self, count: usize) {
        self.lock().failing_saves = count;
    }

    /// Replaces the contents as if edited externally and fires every
    /// registered change callback.
    pub fn replace_external(&self, values: Map<String, Value>) {
        let callbacks = {
            let mut inner = self.lock();
            inner.values = values;
            inner.watchers.callbacks()
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Sets one key as if edited externally and fires change callbacks.
    pub fn set_external(&self, key: &str, value: Value) {
        let mut values = self.snapshot();
        values.insert(key.to_string(), value);
        self.replace_external(values);
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.lock().values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.lock().values.remove(key)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.available {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        if inner.failing_saves > 0 {
            inner.failing_saves -= 1;
            return Err(StoreError::Unavailable("in-memory save rejected".to_string()));
        }
        inner.saves += 1;
        Ok(())
    }

    fn refresh(&mut self) -> Result<bool, StoreError> {
        if !self.lock().available {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        // External edits notify immediately; there is nothing to pick up.
        Ok(false)
    }

    fn add_on_change(&mut self, tag: &str, callback: ChangeCallback) {
        self.lock().watchers.add(tag, callback);
    }

    fn clear_on_change(&mut self, tag: &str) {
        self.lock().watchers.clear(tag);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
