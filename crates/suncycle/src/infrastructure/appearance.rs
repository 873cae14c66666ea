//! OS appearance probes.
//!
//! | Probe              | Source                                        |
//! |--------------------|-----------------------------------------------|
//! | [`DefaultsProbe`]  | `defaults read -g AppleInterfaceStyle` (macOS) |
//! | [`FixedAppearance`]| a value set by the caller (`--appearance`, tests) |
//!
//! Probes never fail.  If the query command cannot be launched the probe
//! reports [`Appearance::Day`]; the failure is logged at `debug` only.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use suncycle_core::Appearance;
use tracing::debug;

use crate::application::reconcile::AppearanceProbe;

/// Queries the interface style through an external command.
#[derive(Debug, Clone)]
pub struct DefaultsProbe {
    program: String,
    args: Vec<String>,
}

impl DefaultsProbe {
    /// The macOS query: `defaults read -g AppleInterfaceStyle`.
    pub fn new() -> Self {
        Self::with_command("defaults", ["read", "-g", "AppleInterfaceStyle"])
    }

    /// A probe running an arbitrary command.  Non-blank stdout means night.
    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for DefaultsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl AppearanceProbe for DefaultsProbe {
    fn appearance(&self) -> Appearance {
        // Only stdout matters: in light mode `defaults` prints an error to
        // stderr and exits non-zero, which is the expected "day" answer.
        match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => Appearance::from_interface_style(&output.stdout),
            Err(e) => {
                debug!(program = %self.program, "appearance query failed: {e}");
                Appearance::Day
            }
        }
    }
}

/// A probe that reports whatever the caller last set.
///
/// Clones share state, so a test can flip the mode while the controller owns
/// another clone.  Every query is counted.
#[derive(Debug, Clone, Default)]
pub struct FixedAppearance {
    night: Arc<AtomicBool>,
    queries: Arc<AtomicUsize>,
}

impl FixedAppearance {
    pub fn new(appearance: Appearance) -> Self {
        let probe = Self::default();
        probe.set(appearance);
        probe
    }

    /// Changes the reported appearance.
    pub fn set(&self, appearance: Appearance) {
        self.night
            .store(appearance == Appearance::Night, Ordering::SeqCst);
    }

    /// Number of times [`AppearanceProbe::appearance`] has been called.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl AppearanceProbe for FixedAppearance {
    fn appearance(&self) -> Appearance {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.night.load(Ordering::SeqCst) {
            Appearance::Night
        } else {
            Appearance::Day
        }
    }
}

/// Returns the probe for this platform, or a fixed probe when `forced` is set.
pub fn select_probe(forced: Option<Appearance>) -> Box<dyn AppearanceProbe> {
    match forced {
        Some(appearance) => Box::new(FixedAppearance::new(appearance)),
        None => Box::new(DefaultsProbe::new()),
    }
}

/// `true` on platforms where [`DefaultsProbe::new`] can report night.
pub fn native_detection_supported() -> bool {
    cfg!(target_os = "macos")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_appearance_reports_and_counts() {
        // Arrange
        let probe = FixedAppearance::new(Appearance::Night);
        let observer = probe.clone();

        // Act
        let first = probe.appearance();
        observer.set(Appearance::Day);
        let second = probe.appearance();

        // Assert
        assert_eq!(first, Appearance::Night);
        assert_eq!(second, Appearance::Day);
        assert_eq!(observer.query_count(), 2);
    }

    #[test]
    fn test_missing_program_falls_back_to_day() {
        let probe = DefaultsProbe::with_command("suncycle-no-such-program", Vec::<String>::new());
        assert_eq!(probe.appearance(), Appearance::Day);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_printing_a_style_is_night() {
        let probe = DefaultsProbe::with_command("echo", ["Dark"]);
        assert_eq!(probe.appearance(), Appearance::Night);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_without_output_is_day() {
        // Mirrors `defaults` in light mode: nothing on stdout, non-zero exit.
        let probe = DefaultsProbe::with_command("sh", ["-c", "echo missing >&2; exit 1"]);
        assert_eq!(probe.appearance(), Appearance::Day);
    }

    #[test]
    fn test_select_probe_honours_forced_mode() {
        let probe = select_probe(Some(Appearance::Night));
        assert_eq!(probe.appearance(), Appearance::Night);
    }
}
