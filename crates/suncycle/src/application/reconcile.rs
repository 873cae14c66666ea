//! One reconciliation pass.
//!
//! [`Reconciler::cycle`] is the unit of work the controller repeats on every
//! tick (and after every configuration reload):
//!
//! 1. Ask the [`AppearanceProbe`] whether the OS is in day or night mode.
//! 2. Select the matching [`ThemeBlock`](suncycle_core::ThemeBlock).
//! 3. Refresh the editor preferences; if they cannot be read the pass fails
//!    with [`CycleError::PreferencesUnavailable`].
//! 4. Write each configured key that differs from the live value.
//! 5. Save the preferences only if something changed, so an idle pass causes
//!    no I/O and no change notifications for other observers.  A failed save
//!    restores the previous in-memory values so the next pass retries it.

use serde_json::Value;
use suncycle_core::{
    plan_changes, Appearance, CycleConfig, PreferenceChange, SettingsStore, StoreError,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::PACKAGE;

/// Source of the current OS appearance.
///
/// Implementations must not fail: when the OS cannot be queried they report
/// [`Appearance::Day`].
#[cfg_attr(test, mockall::automock)]
pub trait AppearanceProbe: Send {
    /// Returns the current appearance mode.
    fn appearance(&self) -> Appearance;
}

/// Error type for a reconciliation pass.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The editor preferences could not be read.
    #[error("preferences not loaded: {0}")]
    PreferencesUnavailable(#[source] StoreError),

    /// The updated preferences could not be written.
    #[error("failed to save preferences: {0}")]
    Persist(#[source] StoreError),
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Appearance reported by the probe for this pass.
    pub appearance: Appearance,
    /// Preference writes applied, `color_scheme` first.
    pub changes: Vec<PreferenceChange>,
}

impl CycleOutcome {
    /// `true` when the preferences were written.
    pub fn persisted(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Applies the active theme block to the editor preferences.
pub struct Reconciler {
    probe: Box<dyn AppearanceProbe>,
    preferences: Box<dyn SettingsStore>,
}

impl Reconciler {
    pub fn new(probe: Box<dyn AppearanceProbe>, preferences: Box<dyn SettingsStore>) -> Self {
        Self { probe, preferences }
    }

    /// Runs one reconciliation pass against `config`.
    ///
    /// # Errors
    ///
    /// - [`CycleError::PreferencesUnavailable`] if the preferences cannot be
    ///   refreshed; nothing is written.
    /// - [`CycleError::Persist`] if the changed preferences cannot be saved;
    ///   the in-memory preferences are rolled back.
    pub fn cycle(&mut self, config: &CycleConfig) -> Result<CycleOutcome, CycleError> {
        let appearance = self.probe.appearance();
        let block = config.block(appearance);

        self.preferences
            .refresh()
            .map_err(CycleError::PreferencesUnavailable)?;

        let preferences = &self.preferences;
        let changes = plan_changes(block, |key| {
            preferences
                .get(key.key())
                .and_then(|v| v.as_str().map(str::to_string))
        });

        let mut previous = Vec::with_capacity(changes.len());
        for change in &changes {
            info!("{PACKAGE}: {change}");
            let key = change.key.key();
            previous.push((key, self.preferences.get(key)));
            self.preferences.set(key, Value::String(change.value.clone()));
        }

        if changes.is_empty() {
            debug!(%appearance, "preferences already match");
        } else if let Err(e) = self.preferences.save() {
            self.roll_back(previous);
            return Err(CycleError::Persist(e));
        }

        Ok(CycleOutcome {
            appearance,
            changes,
        })
    }

    fn roll_back(&mut self, previous: Vec<(&'static str, Option<Value>)>) {
        for (key, value) in previous {
            match value {
                Some(value) => self.preferences.set(key, value),
                None => {
                    self.preferences.remove(key);
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use suncycle_core::{MemorySettings, PreferenceKey, ThemeBlock};

    fn probe(mode: Appearance) -> Box<dyn AppearanceProbe> {
        let mut mock = MockAppearanceProbe::new();
        mock.expect_appearance().times(1).return_const(mode);
        Box::new(mock)
    }

    fn block(color_scheme: Option<&str>, theme: Option<&str>) -> ThemeBlock {
        ThemeBlock {
            color_scheme: color_scheme.map(str::to_string),
            theme: theme.map(str::to_string),
        }
    }

    #[test]
    fn test_night_updates_only_differing_color_scheme() {
        // Arrange
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "X", "theme": "B" }));
        let config = CycleConfig {
            day: block(Some("D"), Some("DT")),
            night: block(Some("A"), Some("B")),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Night), Box::new(prefs.clone()));

        // Act
        let outcome = reconciler.cycle(&config).expect("cycle");

        // Assert
        assert_eq!(outcome.appearance, Appearance::Night);
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].key, PreferenceKey::ColorScheme);
        assert!(outcome.changes[0].to_string().contains("Switching to color scheme A"));
        assert_eq!(prefs.save_count(), 1);
        assert_eq!(prefs.snapshot().get("color_scheme"), Some(&json!("A")));
        assert_eq!(prefs.snapshot().get("theme"), Some(&json!("B")));
    }

    #[test]
    fn test_day_block_without_theme_leaves_preferences_alone() {
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "A", "theme": "Y" }));
        let config = CycleConfig {
            day: block(Some("A"), None),
            night: block(Some("N"), Some("NT")),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Day), Box::new(prefs.clone()));

        let outcome = reconciler.cycle(&config).expect("cycle");

        assert!(!outcome.persisted());
        assert_eq!(prefs.save_count(), 0);
        assert_eq!(prefs.snapshot().get("theme"), Some(&json!("Y")));
    }

    #[test]
    fn test_matching_preferences_do_not_persist() {
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "A", "theme": "B" }));
        let config = CycleConfig {
            day: block(Some("A"), Some("B")),
            night: ThemeBlock::default(),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Day), Box::new(prefs.clone()));

        let outcome = reconciler.cycle(&config).expect("cycle");

        assert!(outcome.changes.is_empty());
        assert_eq!(prefs.save_count(), 0);
    }

    #[test]
    fn test_both_keys_change_with_a_single_save() {
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "X", "theme": "Y" }));
        let config = CycleConfig {
            day: ThemeBlock::default(),
            night: block(Some("A"), Some("B")),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Night), Box::new(prefs.clone()));

        let outcome = reconciler.cycle(&config).expect("cycle");

        assert_eq!(outcome.changes.len(), 2);
        assert_eq!(prefs.save_count(), 1);
    }

    #[test]
    fn test_other_preference_keys_are_preserved() {
        let prefs = MemorySettings::from_value(json!({
            "color_scheme": "X",
            "font_size": 13,
            "ignored_packages": ["Vintage"]
        }));
        let config = CycleConfig {
            day: block(Some("A"), None),
            night: ThemeBlock::default(),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Day), Box::new(prefs.clone()));

        reconciler.cycle(&config).expect("cycle");

        let snapshot = prefs.snapshot();
        assert_eq!(snapshot.get("font_size"), Some(&json!(13)));
        assert_eq!(snapshot.get("ignored_packages"), Some(&json!(["Vintage"])));
    }

    #[test]
    fn test_non_string_live_value_is_overwritten() {
        let prefs = MemorySettings::from_value(json!({ "theme": 7 }));
        let config = CycleConfig {
            day: block(None, Some("T")),
            night: ThemeBlock::default(),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Day), Box::new(prefs.clone()));

        let outcome = reconciler.cycle(&config).expect("cycle");

        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(prefs.snapshot().get("theme"), Some(&json!("T")));
    }

    #[test]
    fn test_unavailable_preferences_fail_the_pass_without_writing() {
        // Arrange
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "X" }));
        prefs.set_available(false);
        let config = CycleConfig {
            day: block(Some("A"), None),
            night: ThemeBlock::default(),
        };
        let mut reconciler = Reconciler::new(probe(Appearance::Day), Box::new(prefs.clone()));

        // Act
        let result = reconciler.cycle(&config);

        // Assert
        assert!(matches!(result, Err(CycleError::PreferencesUnavailable(_))));
        assert_eq!(prefs.snapshot().get("color_scheme"), Some(&json!("X")));
        assert_eq!(prefs.save_count(), 0);
    }

    #[test]
    fn test_failed_save_is_retried_on_next_pass() {
        // Arrange
        let prefs = MemorySettings::from_value(json!({ "color_scheme": "X" }));
        prefs.fail_next_saves(1);
        let config = CycleConfig {
            day: ThemeBlock::default(),
            night: block(Some("A"), Some("B")),
        };
        let mut mock = MockAppearanceProbe::new();
        mock.expect_appearance().times(2).return_const(Appearance::Night);
        let mut reconciler = Reconciler::new(Box::new(mock), Box::new(prefs.clone()));

        // Act
        let first = reconciler.cycle(&config);
        let rolled_back = prefs.snapshot();
        let second = reconciler.cycle(&config).expect("second pass");

        // Assert
        assert!(matches!(first, Err(CycleError::Persist(_))));
        assert_eq!(rolled_back.get("color_scheme"), Some(&json!("X")));
        assert!(rolled_back.get("theme").is_none(), "absent keys stay absent");
        assert_eq!(second.changes.len(), 2);
        assert_eq!(prefs.save_count(), 1);
        assert_eq!(prefs.snapshot().get("color_scheme"), Some(&json!("A")));
    }

    #[test]
    fn test_probe_is_queried_once_per_pass() {
        let prefs = MemorySettings::new();
        let mut mock = MockAppearanceProbe::new();
        mock.expect_appearance().times(2).return_const(Appearance::Day);
        let mut reconciler = Reconciler::new(Box::new(mock), Box::new(prefs));
        let config = CycleConfig::default();

        tokio_test::assert_ok!(reconciler.cycle(&config));
        tokio_test::assert_ok!(reconciler.cycle(&config));
    }

    #[test]
    fn test_preferences_unavailable_message() {
        let err =
            CycleError::PreferencesUnavailable(StoreError::Unavailable("offline".to_string()));
        assert!(err.to_string().starts_with("preferences not loaded"));
    }
}
