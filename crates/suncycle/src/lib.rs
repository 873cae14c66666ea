//! suncycle library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does suncycle do? (for beginners)
//!
//! The daemon polls the operating system's light/dark appearance and keeps
//! the editor's `color_scheme` and `theme` preferences in step with it:
//!
//! 1. After a short startup delay it loads the `day` and `night` blocks from
//!    the SunCycle settings and starts watching them for edits.
//! 2. Every poll interval it asks the OS which mode is active.
//! 3. It compares the matching block against the editor preferences and
//!    writes the preferences back only when a value actually differs.

/// Application layer: configuration loader, reconciliation, controller lifecycle.
pub mod application;

/// Infrastructure layer: OS appearance probe and daemon configuration storage.
pub mod infrastructure;

/// Prefix of every user-facing log line (`suncycle: Switching to ...`).
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");
