//! Storage infrastructure: daemon configuration file.
//!
//! The `config` sub-module locates `suncycle.toml` in the platform config
//! directory, parses its `[daemon]` table, and writes the starter template.
//! The `[day]`/`[night]` blocks in the same file are read (and watched) by
//! the application's `ConfigLoader` through a `FileSettings` store.

pub mod config;
