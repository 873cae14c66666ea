//! Day/night theme blocks and the change plan derived from them.
//!
//! A [`ThemeBlock`] is what the user wants the editor to look like in one
//! appearance mode.  Both keys are optional: a block without `theme` leaves
//! the editor theme alone in that mode.
//!
//! ```toml
//! [day]
//! color_scheme = "Packages/Color Scheme - Default/Breakers.sublime-color-scheme"
//! theme = "Default.sublime-theme"
//!
//! [night]
//! color_scheme = "Packages/Color Scheme - Default/Mariana.sublime-color-scheme"
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::appearance::Appearance;

/// Desired editor preferences for one appearance mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeBlock {
    /// Value written to the editor's `color_scheme` preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,
    /// Value written to the editor's `theme` preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl ThemeBlock {
    /// Returns the configured value for `key`, treating an empty string as unset.
    pub fn value(&self, key: PreferenceKey) -> Option<&str> {
        let value = match key {
            PreferenceKey::ColorScheme => self.color_scheme.as_deref(),
            PreferenceKey::Theme => self.theme.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// The pair of blocks loaded from the SunCycle settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub day: ThemeBlock,
    pub night: ThemeBlock,
}

impl CycleConfig {
    /// Selects the block matching the current appearance.
    pub fn block(&self, appearance: Appearance) -> &ThemeBlock {
        match appearance {
            Appearance::Day => &self.day,
            Appearance::Night => &self.night,
        }
    }
}

/// The editor preference keys SunCycle manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    ColorScheme,
    Theme,
}

impl PreferenceKey {
    /// Keys in the order they are reconciled.
    pub const ALL: [PreferenceKey; 2] = [PreferenceKey::ColorScheme, PreferenceKey::Theme];

    /// Key name in the editor preference store.
    pub fn key(self) -> &'static str {
        match self {
            PreferenceKey::ColorScheme => "color_scheme",
            PreferenceKey::Theme => "theme",
        }
    }

    /// Human-readable name used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            PreferenceKey::ColorScheme => "color scheme",
            PreferenceKey::Theme => "theme",
        }
    }
}

/// One preference write produced by a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceChange {
    pub key: PreferenceKey,
    pub value: String,
}

impl fmt::Display for PreferenceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Switching to {} {}", self.key.label(), self.value)
    }
}

/// Computes which preferences must change for the live state to match `block`.
///
/// `current` returns the live string value of a key, or `None` when the key is
/// unset or not a string.  A key the block leaves unset (or empty) is never
/// changed.  The result is ordered `color_scheme` first, then `theme`.
pub fn plan_changes<F>(block: &ThemeBlock, current: F) -> Vec<PreferenceChange>
where
    F: Fn(PreferenceKey) -> Option<String>,
{
    PreferenceKey::ALL
        .into_iter()
        .filter_map(|key| {
            let wanted = block.value(key)?;
            if current(key).as_deref() == Some(wanted) {
                return None;
            }
            Some(PreferenceChange {
                key,
                value: wanted.to_string(),
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
