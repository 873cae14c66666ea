//! Infrastructure layer for the daemon.
//!
//! Contains OS-facing adapters: the appearance probe that shells out to the
//! platform, and the storage helpers that locate and parse the daemon's
//! configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `suncycle_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod appearance;
pub mod storage;
