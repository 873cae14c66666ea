//! File-backed settings store.
//!
//! Editor preferences are JSON documents (for example Sublime Text's
//! `Preferences.sublime-settings`); the SunCycle settings live in a TOML file
//! alongside the daemon options.  Both are loaded into the same
//! `serde_json::Map` so the rest of the code never cares which format is on
//! disk.
//!
//! Change detection is poll-based: [`SettingsStore::refresh`] re-reads the
//! file and fires change callbacks when the text differs from what was last
//! read or written.  Writes made through [`SettingsStore::save`] update that
//! baseline, so a store never notifies itself about its own save.
//!
//! A file that cannot be parsed (for example preferences with `//` comments)
//! makes the store unhealthy until its text changes: every `refresh` repeats
//! the parse error and `save` refuses to overwrite the file.
//!
//! Keys this process never touches are written back exactly as they were
//! read (modulo formatting), so rewriting `color_scheme` does not drop the
//! user's other preferences.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use super::{ChangeCallback, SettingsStore, StoreError, Watchers};

/// On-disk format of a [`FileSettings`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Json,
    Toml,
}

impl SettingsFormat {
    /// Picks the format from a file extension: `.toml` is TOML, anything else
    /// (`.json`, `.sublime-settings`, ...) is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SettingsFormat::Toml,
            _ => SettingsFormat::Json,
        }
    }

    fn parse(self, path: &Path, text: &str) -> Result<Map<String, Value>, StoreError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let parse_err = |message: String| StoreError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let value = match self {
            SettingsFormat::Json => {
                serde_json::from_str::<Value>(text).map_err(|e| parse_err(e.to_string()))?
            }
            SettingsFormat::Toml => {
                toml::from_str::<Value>(text).map_err(|e| parse_err(e.to_string()))?
            }
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotATable(path.to_path_buf())),
        }
    }

    fn render(self, path: &Path, values: &Map<String, Value>) -> Result<String, StoreError> {
        let ser_err = |message: String| StoreError::Serialize {
            path: path.to_path_buf(),
            message,
        };
        match self {
            SettingsFormat::Json => serde_json::to_string_pretty(values)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| ser_err(e.to_string())),
            SettingsFormat::Toml => {
                toml::to_string_pretty(values).map_err(|e| ser_err(e.to_string()))
            }
        }
    }
}

/// A [`SettingsStore`] persisted to a single file.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    format: SettingsFormat,
    required: bool,
    values: Map<String, Value>,
    /// Text last read from or written to disk; `None` before the first read.
    baseline: Option<String>,
    /// Parse error for the text in `baseline`, if it could not be parsed.
    unparsed: Option<String>,
    watchers: Watchers,
}

impl FileSettings {
    /// Creates a store for `path` without touching the file system.
    ///
    /// The first [`refresh`](SettingsStore::refresh) loads the file.
    pub fn new(path: impl Into<PathBuf>, format: SettingsFormat) -> Self {
        Self {
            path: path.into(),
            format,
            required: false,
            values: Map::new(),
            baseline: None,
            unparsed: None,
            watchers: Watchers::default(),
        }
    }

    /// When `true`, a missing file is an error instead of an empty store.
    ///
    /// Editor preferences are required: they are created by the editor, and
    /// writing a fresh file in their place would hide a misconfigured path.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Creates the store and performs the initial read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed.
    pub fn open(
        path: impl Into<PathBuf>,
        format: SettingsFormat,
        required: bool,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new(path, format).required(required);
        store.refresh()?;
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the backing file.
    pub fn format(&self) -> SettingsFormat {
        self.format
    }

    fn read_text(&self) -> Result<String, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound && !self.required => Ok(String::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if self.unparsed.is_some() {
            return Err(StoreError::Unparsed(self.path.clone()));
        }
        let content = self.format.render(&self.path, &self.values)?;

        // Ensure directory exists before writing.
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, &content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.baseline = Some(content);
        Ok(())
    }

    fn refresh(&mut self) -> Result<bool, StoreError> {
        let text = self.read_text()?;
        if self.baseline.as_deref() == Some(text.as_str()) {
            return match &self.unparsed {
                Some(message) => Err(StoreError::Parse {
                    path: self.path.clone(),
                    message: message.clone(),
                }),
                None => Ok(false),
            };
        }

        // The last good values stay in place while the file is broken.
        let parsed = self.format.parse(&self.path, &text);
        self.baseline = Some(text);
        match parsed {
            Ok(values) => {
                self.values = values;
                self.unparsed = None;
            }
            Err(e) => {
                self.unparsed = Some(e.to_string());
                return Err(e);
            }
        }
        debug!(path = %self.path.display(), keys = self.values.len(), "settings reloaded");

        for callback in self.watchers.callbacks() {
            callback();
        }
        Ok(true)
    }

    fn add_on_change(&mut self, tag: &str, callback: ChangeCallback) {
        self.watchers.add(tag, callback);
    }

    fn clear_on_change(&mut self, tag: &str) {
        self.watchers.clear(tag);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
