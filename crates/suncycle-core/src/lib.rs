//! # suncycle-core
//!
//! Shared library for SunCycle containing the appearance/theme domain and the
//! settings-store abstraction the daemon reads from and writes to.
//!
//! This crate has no dependency on OS APIs, async runtimes, or process
//! spawning.  Everything here can be unit-tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! SunCycle watches the operating system's light/dark appearance and swaps an
//! editor's `color_scheme` and `theme` preferences to match.  The user keeps
//! one "day" block and one "night" block in the SunCycle settings; whenever the
//! OS flips mode, the matching block is written into the editor preferences.
//!
//! - **`domain`** – Pure rules: which appearance is active, what a day/night
//!   block looks like, and which preference keys need to change.
//!
//! - **`settings`** – A small key-value store abstraction with named change
//!   callbacks, plus an in-memory implementation (tests, embedding) and a
//!   file-backed one (JSON editor preferences, TOML SunCycle config).

pub mod domain;
pub mod settings;

// Re-export the most-used types at the crate root so callers can write
// `suncycle_core::Appearance` instead of `suncycle_core::domain::appearance::Appearance`.
pub use domain::appearance::{Appearance, ParseAppearanceError};
pub use domain::theme::{plan_changes, CycleConfig, PreferenceChange, PreferenceKey, ThemeBlock};
pub use settings::file::{FileSettings, SettingsFormat};
pub use settings::memory::MemorySettings;
pub use settings::{ChangeCallback, SettingsStore, StoreError};
