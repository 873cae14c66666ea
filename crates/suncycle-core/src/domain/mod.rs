//! Domain entities for SunCycle.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no process spawning, no file system access, no timers.
//!
//! Code in outer layers (the daemon's application and infrastructure layers)
//! depends on the domain, but the domain never depends on them.

/// The two OS appearance modes and how the OS query output maps onto them.
pub mod appearance;

/// Day/night theme blocks and the per-key change plan.
pub mod theme;
