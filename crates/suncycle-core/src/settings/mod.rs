//! Key-value settings stores with named change callbacks.
//!
//! SunCycle talks to two stores:
//!
//! - the **SunCycle settings**, which hold the `day` and `night` blocks and
//!   are watched for changes so edits take effect without a restart;
//! - the **editor preferences**, which hold the live `color_scheme` and
//!   `theme` values that SunCycle rewrites.
//!
//! Both are accessed through the [`SettingsStore`] trait so the application
//! layer can be exercised with [`memory::MemorySettings`] in tests and with
//! [`file::FileSettings`] in production.
//!
//! # Change callbacks
//!
//! Watchers register a callback under a *tag* (their identity).  A tag has at
//! most one callback: registering the same tag again replaces the previous
//! callback, and [`SettingsStore::clear_on_change`] removes it.  Callbacks run
//! synchronously on the thread that detected the change and must not call
//! back into the store.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub mod file;
pub mod memory;

/// Callback invoked when a store's contents change.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Error type for settings store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be parsed.
    #[error("failed to parse settings at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The settings file parsed, but its top level is not a key-value table.
    #[error("settings at {0} must be a table/object at the top level")]
    NotATable(PathBuf),

    /// The settings could not be serialized for writing.
    #[error("failed to serialize settings for {path}: {message}")]
    Serialize { path: PathBuf, message: String },

    /// The file on disk could not be parsed, so writing would destroy it.
    #[error("refusing to overwrite {0}: its contents could not be parsed")]
    Unparsed(PathBuf),

    /// The store has not been initialised by its owner yet.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// A key-value settings store with named change callbacks.
pub trait SettingsStore: Send {
    /// Returns the current value of `key`, if present.
    fn get(&self, key: &str) -> Option<Value>;

    /// Returns `true` if `key` is present and not `null`.
    fn has(&self, key: &str) -> bool {
        self.get(key).map_or(false, |v| !v.is_null())
    }

    /// Sets `key` in memory.  Nothing is written until [`save`](Self::save).
    fn set(&mut self, key: &str, value: Value);

    /// Removes `key` in memory, returning its previous value.
    fn remove(&mut self, key: &str) -> Option<Value>;

    /// Persists the whole store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be written.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Re-reads the backing storage and fires change callbacks if it changed.
    ///
    /// Returns `true` when new contents were picked up.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read or parsed,
    /// or if the store is not available.
    fn refresh(&mut self) -> Result<bool, StoreError>;

    /// Registers `callback` under `tag`, replacing any callback already
    /// registered under the same tag.
    fn add_on_change(&mut self, tag: &str, callback: ChangeCallback);

    /// Removes the callback registered under `tag`, if any.
    fn clear_on_change(&mut self, tag: &str);
}

/// Tag-keyed callback registry shared by the store implementations.
#[derive(Default, Clone)]
pub(crate) struct Watchers {
    entries: Vec<(String, ChangeCallback)>,
}

impl Watchers {
    pub(crate) fn add(&mut self, tag: &str, callback: ChangeCallback) {
        self.clear(tag);
        self.entries.push((tag.to_string(), callback));
    }

    pub(crate) fn clear(&mut self, tag: &str) {
        self.entries.retain(|(t, _)| t != tag);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of the registered callbacks, so they can be invoked after any
    /// lock on the owning store has been released.
    pub(crate) fn callbacks(&self) -> Vec<ChangeCallback> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

impl std::fmt::Debug for Watchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(tag, _)| tag))
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let cb: ChangeCallback = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, cb)
    }

    #[test]
    fn test_watchers_same_tag_replaces_previous_callback() {
        // Arrange
        let mut watchers = Watchers::default();
        let (first, cb1) = counter();
        let (second, cb2) = counter();

        // Act
        watchers.add("suncycle", cb1);
        watchers.add("suncycle", cb2);
        for cb in watchers.callbacks() {
            cb();
        }

        // Assert
        assert_eq!(watchers.len(), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_watchers_distinct_tags_coexist() {
        let mut watchers = Watchers::default();
        let (_, cb1) = counter();
        let (_, cb2) = counter();

        watchers.add("a", cb1);
        watchers.add("b", cb2);

        assert_eq!(watchers.len(), 2);
    }

    #[test]
    fn test_watchers_clear_removes_only_that_tag() {
        let mut watchers = Watchers::default();
        let (a, cb1) = counter();
        let (b, cb2) = counter();
        watchers.add("a", cb1);
        watchers.add("b", cb2);

        watchers.clear("a");
        for cb in watchers.callbacks() {
            cb();
        }

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_watchers_clear_unknown_tag_is_noop() {
        let mut watchers = Watchers::default();
        watchers.clear("missing");
        assert_eq!(watchers.len(), 0);
    }
}
