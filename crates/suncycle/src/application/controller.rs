//! Cycle controller: the delayed-start, self-rescheduling reconciliation loop.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──spawn──▶ Starting ──startup delay──▶ Running ──stop()──▶ Halted
//!                        │                         │  ▲
//!                        └────────stop()───────────┘  └── tick every poll interval
//! ```
//!
//! - **Starting** waits for the startup delay so whoever writes the SunCycle
//!   settings has finished initialising them.
//! - **Running** builds the [`ConfigLoader`] (its `on_change` hook queues a
//!   reconciliation) and then, on every tick, schedules the next tick and
//!   runs one pass.  The next tick is a fresh single-shot deadline, not a
//!   fixed-rate interval.
//! - **Halted** is reached through [`CycleController::stop`]; the loader's
//!   watch is cleared and no further passes run.
//!
//! # Single logical thread
//!
//! All work for one controller happens inside one Tokio task.  Change
//! notifications from the settings store are forwarded into that task over an
//! unbounded channel, so reloads and passes never overlap, and a queued
//! reload (plus the pass it triggers) is handled before the next tick.  When
//! a tick's own refresh picks up an edit, the queued work is drained first and
//! the pass it ran stands in for the tick's pass.
//!
//! # One active controller
//!
//! [`Supervisor`] owns at most one controller and always stops the previous
//! one before spawning a replacement, so two loops never race to rewrite the
//! same preferences.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use suncycle_core::SettingsStore;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info};

use super::config_loader::{ConfigLoader, LoadError};
use super::reconcile::{AppearanceProbe, CycleError, CycleOutcome, Reconciler};
use crate::PACKAGE;

/// Delay between spawning a controller and its first pass.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(500);

/// Delay between two scheduled passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Timer settings for a [`CycleController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub startup_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            startup_delay: DEFAULT_STARTUP_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The collaborators a controller drives.
pub struct ControllerParts {
    /// SunCycle settings holding the `day` and `night` blocks.
    pub config_store: Box<dyn SettingsStore>,
    /// Editor preferences holding `color_scheme` and `theme`.
    pub preferences: Box<dyn SettingsStore>,
    /// OS appearance source.
    pub probe: Box<dyn AppearanceProbe>,
}

/// Observable lifecycle state of a [`CycleController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    Starting,
    Running,
    Halted,
}

/// Error type for [`run_single_pass`].
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Work queued into the controller task from store callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// The SunCycle settings signalled a change; reload them.
    ConfigChanged,
    /// A reload succeeded; run a pass with the new configuration.
    Reconcile,
}

/// Handle to a running reconciliation loop.
///
/// Dropping the handle halts the loop without waiting for it; prefer
/// [`stop`](Self::stop), which also waits until the watch is cleared.
pub struct CycleController {
    halted: Arc<AtomicBool>,
    wake: Arc<Notify>,
    state: watch::Receiver<ControllerState>,
    task: Option<JoinHandle<()>>,
}

impl CycleController {
    /// Spawns the controller task.  Must be called from within a Tokio runtime.
    pub fn spawn(parts: ControllerParts, timing: Timing) -> Self {
        let halted = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let (state_tx, state_rx) = watch::channel(ControllerState::Created);

        let ControllerParts {
            config_store,
            preferences,
            probe,
        } = parts;
        let worker = Worker {
            reconciler: Reconciler::new(probe, preferences),
            timing,
            halted: Arc::clone(&halted),
            wake: Arc::clone(&wake),
            state: state_tx,
        };
        let task = tokio::spawn(worker.run(config_store));

        Self {
            halted,
            wake,
            state: state_rx,
            task: Some(task),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    /// `true` once a stop has been requested.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Halts the loop and waits for the task to clear its configuration watch.
    ///
    /// A pass already executing finishes; no pass starts afterwards.
    pub async fn stop(mut self) {
        self.request_halt();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("{PACKAGE}: controller task ended abnormally: {e}");
            }
        }
    }

    fn request_halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        // notify_one stores a permit if the task is not currently waiting.
        self.wake.notify_one();
    }
}

impl Drop for CycleController {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.request_halt();
        }
    }
}

/// State owned by the controller task.
struct Worker {
    reconciler: Reconciler,
    timing: Timing,
    halted: Arc<AtomicBool>,
    wake: Arc<Notify>,
    state: watch::Sender<ControllerState>,
}

impl Worker {
    async fn run(mut self, config_store: Box<dyn SettingsStore>) {
        let wake = Arc::clone(&self.wake);
        self.set_state(ControllerState::Starting);
        debug!(delay = ?self.timing.startup_delay, "controller starting");

        tokio::select! {
            biased;
            _ = wake.notified() => {}
            _ = sleep(self.timing.startup_delay) => {}
        }
        if self.is_halted() {
            self.set_state(ControllerState::Halted);
            debug!("controller stopped before start-up");
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let reconcile_tx = tx.clone();
        let mut loader = ConfigLoader::new(config_store, PACKAGE)
            .on_change(move || {
                if reconcile_tx.send(Command::Reconcile).is_err() {
                    debug!("controller gone; reconcile request dropped");
                }
            })
            .on_notify(move || {
                if tx.send(Command::ConfigChanged).is_err() {
                    debug!("controller gone; change notification dropped");
                }
            });
        if let Err(e) = loader.load() {
            error!("{PACKAGE}: {e}");
        }

        self.set_state(ControllerState::Running);
        info!(interval = ?self.timing.poll_interval, "cycle loop running");

        let mut next_tick = Instant::now();
        loop {
            if self.is_halted() {
                break;
            }
            tokio::select! {
                biased;
                _ = wake.notified() => continue,
                Some(command) = rx.recv() => {
                    self.handle(command, &mut loader);
                }
                _ = sleep_until(next_tick) => {
                    if self.is_halted() {
                        break;
                    }
                    next_tick = Instant::now() + self.timing.poll_interval;
                    self.poll_config(&mut loader);
                    if !self.drain(&mut rx, &mut loader) {
                        self.reconcile(&loader);
                    }
                }
            }
        }

        loader.unload();
        self.set_state(ControllerState::Halted);
        info!("cycle loop halted");
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ControllerState) {
        self.state.send_replace(state);
    }

    /// Runs one queued command.  Returns `true` if it ran a pass.
    fn handle(&mut self, command: Command, loader: &mut ConfigLoader) -> bool {
        match command {
            Command::ConfigChanged => {
                self.poll_config(loader);
                false
            }
            Command::Reconcile => {
                self.reconcile(loader);
                true
            }
        }
    }

    /// Runs every command already queued.  Returns `true` if any ran a pass.
    fn drain(&mut self, rx: &mut UnboundedReceiver<Command>, loader: &mut ConfigLoader) -> bool {
        let mut reconciled = false;
        while let Ok(command) = rx.try_recv() {
            reconciled |= self.handle(command, loader);
        }
        reconciled
    }

    fn poll_config(&mut self, loader: &mut ConfigLoader) {
        if self.is_halted() {
            return;
        }
        match loader.poll() {
            Ok(true) => info!("{PACKAGE}: configuration reloaded"),
            Ok(false) => {}
            Err(e) => error!("{PACKAGE}: {e}"),
        }
    }

    fn reconcile(&mut self, loader: &ConfigLoader) {
        if self.is_halted() {
            return;
        }
        let Some(config) = loader.config() else {
            debug!("no configuration loaded; skipping pass");
            return;
        };
        match self.reconciler.cycle(config) {
            Ok(outcome) => debug!(
                appearance = %outcome.appearance,
                changes = outcome.changes.len(),
                "pass complete"
            ),
            Err(e) => error!("{PACKAGE}: {e}"),
        }
    }
}

/// Loads the configuration and runs exactly one pass, without timers.
///
/// # Errors
///
/// Returns [`PassError::Load`] if the configuration is missing or invalid and
/// [`PassError::Cycle`] if the preferences cannot be read or written.
pub fn run_single_pass(parts: ControllerParts) -> Result<CycleOutcome, PassError> {
    let ControllerParts {
        config_store,
        preferences,
        probe,
    } = parts;
    let mut loader = ConfigLoader::new(config_store, PACKAGE);
    let config = loader.load()?.clone();
    loader.unload();
    Ok(Reconciler::new(probe, preferences).cycle(&config)?)
}

/// Owner of the one active [`CycleController`].
#[derive(Default)]
pub struct Supervisor {
    active: Option<CycleController>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the active controller (if any), then spawns a new one.
    pub async fn start(&mut self, parts: ControllerParts, timing: Timing) -> &CycleController {
        if let Some(previous) = self.active.take() {
            info!("stopping previous controller");
            previous.stop().await;
        }
        &*self.active.insert(CycleController::spawn(parts, timing))
    }

    /// Stops the active controller, if any.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop().await;
        }
    }

    /// The active controller, if any.
    pub fn active(&self) -> Option<&CycleController> {
        self.active.as_ref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
