//! Loads the `day`/`night` blocks and keeps them current.
//!
//! [`ConfigLoader`] owns the SunCycle settings store.  Every [`load`] first
//! re-registers the loader's change callback under its watch tag (clearing the
//! previous registration, so reloads never stack watchers), then validates and
//! installs both blocks.
//!
//! The store's callback cannot call back into the loader directly (the loader
//! is the store's owner), so the callback only marks a reload as pending and
//! pokes the owner through the optional `on_notify` hook.  The owner then
//! calls [`poll`], which performs the pending reload.
//!
//! [`load`]: ConfigLoader::load
//! [`poll`]: ConfigLoader::poll

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use suncycle_core::{Appearance, CycleConfig, SettingsStore, StoreError, ThemeBlock};
use thiserror::Error;
use tracing::debug;

/// Callback supplied by the loader's owner.
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A required block is absent from the SunCycle settings.
    #[error("missing {block} setting")]
    MissingConfiguration { block: &'static str },

    /// A block is present but not a table of string values.
    #[error("invalid {block} setting: {source}")]
    InvalidBlock {
        block: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads and watches the SunCycle `day`/`night` configuration.
pub struct ConfigLoader {
    store: Box<dyn SettingsStore>,
    tag: String,
    on_change: Option<Hook>,
    on_notify: Option<Arc<dyn Fn() + Send + Sync>>,
    pending: Arc<AtomicBool>,
    config: Option<CycleConfig>,
    loaded: bool,
    watching: bool,
}

impl ConfigLoader {
    /// Creates an idle loader.  Nothing is read until [`load`](Self::load).
    ///
    /// `tag` is the watcher identity used for the store's change callback.
    pub fn new(store: Box<dyn SettingsStore>, tag: impl Into<String>) -> Self {
        Self {
            store,
            tag: tag.into(),
            on_change: None,
            on_notify: None,
            pending: Arc::new(AtomicBool::new(false)),
            config: None,
            loaded: false,
            watching: false,
        }
    }

    /// Sets the callback invoked after every successful reload except the first.
    pub fn on_change(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(hook));
        self
    }

    /// Sets the hook invoked (from inside the store) when the settings change.
    ///
    /// The owner should respond by calling [`poll`](Self::poll).
    pub fn on_notify(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_notify = Some(Arc::new(hook));
        self
    }

    /// Reads both blocks, installing them only if both are valid.
    ///
    /// Registers (or re-registers) the change watch before validating, so an
    /// invalid configuration is retried on the next change notification.
    ///
    /// # Errors
    ///
    /// - [`LoadError::MissingConfiguration`] if `day` or `night` is absent.
    /// - [`LoadError::InvalidBlock`] if a block is not a table of strings.
    ///
    /// In both cases the previously installed configuration is kept.
    pub fn load(&mut self) -> Result<&CycleConfig, LoadError> {
        self.watch();
        self.pending.store(false, Ordering::SeqCst);

        let day = self.read_block(Appearance::Day)?;
        let night = self.read_block(Appearance::Night)?;
        let installed = self.config.insert(CycleConfig { day, night });
        debug!(tag = %self.tag, "configuration loaded");

        if self.loaded {
            if let Some(hook) = &self.on_change {
                hook();
            }
        }
        self.loaded = true;

        Ok(&*installed)
    }

    /// Picks up external edits: refreshes the store and, if a change
    /// notification arrived, reloads.
    ///
    /// Returns `true` when a reload succeeded.  An unloaded loader is inert
    /// and always returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the store cannot be refreshed or the reload
    /// fails validation.
    pub fn poll(&mut self) -> Result<bool, LoadError> {
        if !self.watching {
            return Ok(false);
        }
        self.store.refresh()?;
        if self.pending.swap(false, Ordering::SeqCst) {
            self.load()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Deregisters the change watch.  No further reloads happen.
    pub fn unload(&mut self) {
        self.store.clear_on_change(&self.tag);
        self.watching = false;
        self.loaded = false;
        self.pending.store(false, Ordering::SeqCst);
        debug!(tag = %self.tag, "configuration watch cleared");
    }

    /// The currently installed configuration, if any load has succeeded.
    pub fn config(&self) -> Option<&CycleConfig> {
        self.config.as_ref()
    }

    /// `true` once a load has succeeded (until [`unload`](Self::unload)).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// `true` while the change watch is registered.
    pub fn is_watching(&self) -> bool {
        self.watching
    }

    fn watch(&mut self) {
        self.store.clear_on_change(&self.tag);
        let pending = Arc::clone(&self.pending);
        let notify = self.on_notify.clone();
        self.store.add_on_change(
            &self.tag,
            Arc::new(move || {
                pending.store(true, Ordering::SeqCst);
                if let Some(hook) = &notify {
                    hook();
                }
            }),
        );
        self.watching = true;
    }

    fn read_block(&self, appearance: Appearance) -> Result<ThemeBlock, LoadError> {
        let block = appearance.key();
        let value = self
            .store
            .get(block)
            .filter(|v| !v.is_null())
            .ok_or(LoadError::MissingConfiguration { block })?;
        serde_json::from_value(value).map_err(|source| LoadError::InvalidBlock { block, source })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
