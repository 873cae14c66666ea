//! TOML-based daemon configuration.
//!
//! SunCycle keeps everything in one file, `suncycle.toml`, in the
//! platform-appropriate config directory:
//! - Windows:  `%APPDATA%\SunCycle\suncycle.toml`
//! - Linux:    `~/.config/suncycle/suncycle.toml`
//! - macOS:    `~/Library/Application Support/SunCycle/suncycle.toml`
//!
//! ```toml
//! [daemon]
//! startup_delay_ms = 500
//! poll_interval_ms = 5000
//! log_level = "info"
//!
//! [day]
//! color_scheme = "Packages/Color Scheme - Default/Breakers.sublime-color-scheme"
//!
//! [night]
//! color_scheme = "Packages/Color Scheme - Default/Mariana.sublime-color-scheme"
//! ```
//!
//! This module only interprets `[daemon]`.  The `[day]` and `[night]` blocks
//! are read by the `ConfigLoader`, which also watches the file for edits.
//!
//! # Serde default values
//!
//! Every `[daemon]` field has a `#[serde(default = "...")]`, so a file with
//! only the day/night blocks (or no file at all) runs with the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::controller::{Timing, DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_DELAY};

/// File name of the SunCycle settings inside the config directory.
pub const CONFIG_FILE_NAME: &str = "suncycle.toml";

/// Starter file written by `suncycle init`.
pub const CONFIG_TEMPLATE: &str = r#"# SunCycle settings.  Edits to [day] and [night] are picked up while the
# daemon runs; [daemon] options apply on the next start.

[daemon]
startup_delay_ms = 500
poll_interval_ms = 5000
log_level = "info"
# preferences_path = "/path/to/Preferences.sublime-settings"

[day]
color_scheme = "Packages/Color Scheme - Default/Breakers.sublime-color-scheme"
theme = "Default.sublime-theme"

[night]
color_scheme = "Packages/Color Scheme - Default/Mariana.sublime-color-scheme"
theme = "Default Dark.sublime-theme"
"#;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The parts of `suncycle.toml` the daemon itself interprets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Options under `[daemon]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// Delay before the first pass, in milliseconds.
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    /// Delay between passes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Editor preferences file; defaults to the Sublime Text user preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,
}

fn default_startup_delay_ms() -> u64 {
    u64::try_from(DEFAULT_STARTUP_DELAY.as_millis()).unwrap_or(u64::MAX)
}
fn default_poll_interval_ms() -> u64 {
    u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
            preferences_path: None,
        }
    }
}

impl DaemonConfig {
    /// Controller timing derived from the configured milliseconds.
    pub fn timing(&self) -> Timing {
        Timing {
            startup_delay: Duration::from_millis(self.startup_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the daemon options from `path`, returning defaults if the file does
/// not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes [`CONFIG_TEMPLATE`] to `path` unless a file is already there.
///
/// Returns `true` if the template was written.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the directory or file cannot be created.
pub fn write_template(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    // Ensure directory exists before writing.
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, CONFIG_TEMPLATE).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Default editor preferences file: Sublime Text's user `Preferences.sublime-settings`.
pub fn default_preferences_path() -> Option<PathBuf> {
    let packages_user = |base: PathBuf| {
        base.join("Packages")
            .join("User")
            .join("Preferences.sublime-settings")
    };

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| packages_user(PathBuf::from(p).join("Sublime Text")))
    }

    #[cfg(target_os = "linux")]
    {
        xdg_config_home().map(|base| packages_user(base.join("sublime-text")))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            packages_user(
                PathBuf::from(h)
                    .join("Library")
                    .join("Application Support")
                    .join("Sublime Text"),
            )
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        let _ = packages_user;
        None
    }
}

/// Resolves the platform config base directory including the `SunCycle` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SunCycle"))
    }

    #[cfg(target_os = "linux")]
    {
        Some(xdg_config_home()?.join("suncycle"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/SunCycle
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SunCycle")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

/// XDG_CONFIG_HOME or ~/.config
#[cfg(target_os = "linux")]
fn xdg_config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use suncycle_core::{FileSettings, SettingsFormat, SettingsStore};
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("suncycle_cfg_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_daemon_config_default_timing() {
        // Arrange / Act
        let cfg = DaemonConfig::default();

        // Assert
        assert_eq!(cfg.startup_delay_ms, 500);
        assert_eq!(cfg.poll_interval_ms, 5000);
        assert_eq!(cfg.timing(), Timing::default());
    }

    #[test]
    fn test_daemon_config_default_log_level_is_info() {
        assert_eq!(DaemonConfig::default().log_level, "info");
    }

    #[test]
    fn test_file_without_daemon_table_uses_defaults() {
        // Arrange: only the blocks the loader cares about
        let toml_str = r#"
[day]
color_scheme = "A"

[night]
color_scheme = "B"
"#;

        // Act
        let cfg: ConfigFile = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.daemon, DaemonConfig::default());
    }

    #[test]
    fn test_partial_daemon_table_overrides_defaults() {
        let toml_str = r#"
[daemon]
poll_interval_ms = 1000
preferences_path = "/tmp/Preferences.sublime-settings"
"#;

        let cfg: ConfigFile = toml::from_str(toml_str).expect("deserialize partial");

        assert_eq!(cfg.daemon.poll_interval_ms, 1000);
        assert_eq!(cfg.daemon.startup_delay_ms, 500);
        assert_eq!(
            cfg.daemon.preferences_path,
            Some(PathBuf::from("/tmp/Preferences.sublime-settings"))
        );
        assert_eq!(cfg.daemon.timing().poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let dir = scratch_dir();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/suncycle.toml");

        let cfg = load_config(&path).expect("absent file yields defaults");

        assert_eq!(cfg, ConfigFile::default());
    }

    #[test]
    fn test_template_parses_and_contains_both_blocks() {
        // Arrange
        let dir = scratch_dir();
        let path = dir.join("nested").join(CONFIG_FILE_NAME);

        // Act
        let written = write_template(&path).expect("write template");
        let cfg = load_config(&path).expect("load template");
        let store = FileSettings::open(&path, SettingsFormat::Toml, true).expect("open template");

        // Assert
        assert!(written);
        assert_eq!(cfg.daemon, DaemonConfig::default());
        assert!(store.has("day"));
        assert!(store.has("night"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_template_keeps_existing_file() {
        let dir = scratch_dir();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[day]\n[night]\n").unwrap();

        let written = write_template(&path).expect("write template");

        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[day]\n[night]\n");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_suncycle_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with(CONFIG_FILE_NAME),
                "config file must be named suncycle.toml, got {path:?}"
            );
        }
        // If NoPlatformConfigDir is returned (e.g. in a stripped CI env) that is also acceptable.
    }

    #[test]
    fn test_default_preferences_path_names_sublime_preferences() {
        if let Some(path) = default_preferences_path() {
            assert!(path.ends_with("Packages/User/Preferences.sublime-settings"));
        }
    }
}
