//! Application layer use cases for the daemon.
//!
//! Use cases in this layer orchestrate domain objects from `suncycle_core`
//! and depend only on abstractions ([`SettingsStore`], [`AppearanceProbe`]),
//! so tests drive them with in-memory stores and scripted probes.
//!
//! # Sub-modules
//!
//! - **`config_loader`** – Loads and validates the `day`/`night` blocks and
//!   reloads them when the SunCycle settings change.
//!
//! - **`reconcile`** – One reconciliation pass: query the appearance, pick the
//!   matching block, and write the differing preferences.
//!
//! - **`controller`** – The delayed-start, self-rescheduling loop that ties
//!   the two together, plus the [`Supervisor`] that keeps exactly one loop
//!   active.
//!
//! [`SettingsStore`]: suncycle_core::SettingsStore
//! [`AppearanceProbe`]: reconcile::AppearanceProbe
//! [`Supervisor`]: controller::Supervisor

pub mod config_loader;
pub mod controller;
pub mod reconcile;
