//! SunCycle daemon entry point.
//!
//! Parses the command line, merges it with `suncycle.toml`, initialises
//! logging, and then either runs the reconciliation loop until Ctrl-C or
//! performs a one-off command.
//!
//! # Usage
//!
//! ```text
//! suncycle [OPTIONS] [COMMAND]
//!
//! Commands:
//!   run     Keep the editor theme in step with the OS appearance (default)
//!   check   Load the configuration and run a single pass
//!   detect  Print the current OS appearance
//!   init    Write a starter suncycle.toml
//!
//! Options:
//!   --config <PATH>             SunCycle settings file
//!   --preferences <PATH>        Editor preferences file
//!   --startup-delay-ms <MS>     Delay before the first pass
//!   --poll-interval-ms <MS>     Delay between passes
//!   --log-level <FILTER>        Log filter when RUST_LOG is unset
//!   --appearance <day|night>    Skip OS detection and use this mode
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                    | Description                     |
//! |-----------------------------|---------------------------------|
//! | `SUNCYCLE_CONFIG`           | SunCycle settings file          |
//! | `SUNCYCLE_PREFERENCES`      | Editor preferences file         |
//! | `SUNCYCLE_STARTUP_DELAY_MS` | Delay before the first pass     |
//! | `SUNCYCLE_POLL_INTERVAL_MS` | Delay between passes            |
//! | `SUNCYCLE_APPEARANCE`       | Forced appearance               |
//!
//! CLI args take precedence over environment variables, which take
//! precedence over the `[daemon]` table of `suncycle.toml`.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Settings::resolve()      -- CLI + env + suncycle.toml
//!  └─ Supervisor::start()
//!       └─ CycleController     -- delayed start, one pass per tick
//!            ├─ ConfigLoader   (FileSettings, TOML, watched)
//!            └─ Reconciler     (DefaultsProbe + FileSettings, JSON)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use suncycle::application::controller::{run_single_pass, ControllerParts, Supervisor, Timing};
use suncycle::infrastructure::appearance::{native_detection_supported, select_probe};
use suncycle::infrastructure::storage::config::{
    config_file_path, default_preferences_path, load_config, write_template,
};
use suncycle::PACKAGE;
use suncycle_core::{Appearance, FileSettings, SettingsFormat};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Switches the editor color scheme and theme with the OS light/dark mode.
#[derive(Debug, Parser)]
#[command(name = "suncycle", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SunCycle settings file holding the [day] and [night] blocks.
    #[arg(long, global = true, env = "SUNCYCLE_CONFIG")]
    config: Option<PathBuf>,

    /// Editor preferences file whose color_scheme and theme are rewritten.
    #[arg(long, global = true, env = "SUNCYCLE_PREFERENCES")]
    preferences: Option<PathBuf>,

    /// Delay before the first pass, in milliseconds.
    #[arg(long, global = true, env = "SUNCYCLE_STARTUP_DELAY_MS")]
    startup_delay_ms: Option<u64>,

    /// Delay between passes, in milliseconds.
    #[arg(long, global = true, env = "SUNCYCLE_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug").
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Use this appearance instead of querying the OS.
    #[arg(long, global = true, env = "SUNCYCLE_APPEARANCE")]
    appearance: Option<Appearance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Keep the editor theme in step with the OS appearance until Ctrl-C.
    Run,
    /// Load the configuration and run a single pass.
    Check,
    /// Print the current OS appearance.
    Detect,
    /// Write a starter suncycle.toml if none exists.
    Init,
}

/// Fully resolved runtime settings.
#[derive(Debug)]
struct Settings {
    config_path: PathBuf,
    preferences_path: Option<PathBuf>,
    timing: Timing,
    log_level: String,
    appearance: Option<Appearance>,
}

impl Cli {
    /// Merges the CLI with the `[daemon]` table of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if no config path can be determined or the config
    /// file exists but cannot be parsed.
    fn resolve(&self) -> anyhow::Result<Settings> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => config_file_path().context("no --config given")?,
        };
        let file = load_config(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        let daemon = file.daemon;
        let file_timing = daemon.timing();

        Ok(Settings {
            preferences_path: self
                .preferences
                .clone()
                .or(daemon.preferences_path)
                .or_else(default_preferences_path),
            timing: Timing {
                startup_delay: self
                    .startup_delay_ms
                    .map_or(file_timing.startup_delay, Duration::from_millis),
                poll_interval: self
                    .poll_interval_ms
                    .map_or(file_timing.poll_interval, Duration::from_millis),
            },
            log_level: self.log_level.clone().unwrap_or(daemon.log_level),
            appearance: self.appearance,
            config_path,
        })
    }
}

impl Settings {
    fn controller_parts(&self) -> anyhow::Result<ControllerParts> {
        let preferences_path = self
            .preferences_path
            .clone()
            .context("no editor preferences path; pass --preferences")?;
        let format = SettingsFormat::from_path(&preferences_path);
        let config_store = FileSettings::open(&self.config_path, SettingsFormat::Toml, false)
            .with_context(|| format!("reading {}", self.config_path.display()))?;
        Ok(ControllerParts {
            config_store: Box::new(config_store),
            preferences: Box::new(FileSettings::new(preferences_path, format).required(true)),
            probe: select_probe(self.appearance),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve()?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&settings).await,
        Command::Check => check(&settings),
        Command::Detect => {
            println!("{}", select_probe(settings.appearance).appearance());
            Ok(())
        }
        Command::Init => {
            if write_template(&settings.config_path)? {
                println!("wrote {}", settings.config_path.display());
            } else {
                println!("{} already exists", settings.config_path.display());
            }
            Ok(())
        }
    }
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    info!("{PACKAGE} starting");
    if settings.appearance.is_none() && !native_detection_supported() {
        warn!("OS appearance detection is only supported on macOS; every pass will use day");
    }

    let mut supervisor = Supervisor::new();
    supervisor
        .start(settings.controller_parts()?, settings.timing)
        .await;
    info!(
        config = %settings.config_path.display(),
        "{PACKAGE} ready.  Press Ctrl-C to exit."
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutdown signal received");
    supervisor.stop().await;

    info!("{PACKAGE} stopped");
    Ok(())
}

fn check(settings: &Settings) -> anyhow::Result<()> {
    let outcome = run_single_pass(settings.controller_parts()?)
        .with_context(|| format!("checking {}", settings.config_path.display()))?;
    if outcome.changes.is_empty() {
        println!("{}: preferences already match", outcome.appearance);
    }
    for change in &outcome.changes {
        println!("{}: {change}", outcome.appearance);
    }
    Ok(())
}
