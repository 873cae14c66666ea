//! OS appearance mode.
//!
//! The operating system is either in light mode ("day") or dark mode
//! ("night").  On macOS the mode is read with
//! `defaults read -g AppleInterfaceStyle`, which prints `Dark` in dark mode
//! and prints nothing (and exits non-zero) in light mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The appearance mode reported by the operating system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    /// Light mode.  Also the fallback when the OS query cannot be interpreted.
    #[default]
    Day,
    /// Dark mode.
    Night,
}

/// Error returned when a string is neither `day` nor `night`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown appearance {0:?}: expected \"day\" or \"night\"")]
pub struct ParseAppearanceError(pub String);

impl Appearance {
    /// Both modes, day first.
    pub const ALL: [Appearance; 2] = [Appearance::Day, Appearance::Night];

    /// Settings key of the configuration block that applies in this mode.
    pub fn key(self) -> &'static str {
        match self {
            Appearance::Day => "day",
            Appearance::Night => "night",
        }
    }

    /// Interprets the raw stdout of the interface-style query.
    ///
    /// Any non-blank output means an interface style is set, which is dark
    /// mode.  Blank output means no style is set: light mode.
    pub fn from_interface_style(stdout: &[u8]) -> Self {
        if String::from_utf8_lossy(stdout).trim().is_empty() {
            Appearance::Day
        } else {
            Appearance::Night
        }
    }
}

impl fmt::Display for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Appearance {
    type Err = ParseAppearanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "light" => Ok(Appearance::Day),
            "night" | "dark" => Ok(Appearance::Night),
            _ => Err(ParseAppearanceError(s.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_output_is_night() {
        assert_eq!(Appearance::from_interface_style(b"Dark\n"), Appearance::Night);
    }

    #[test]
    fn test_empty_output_is_day() {
        assert_eq!(Appearance::from_interface_style(b""), Appearance::Day);
    }

    #[test]
    fn test_whitespace_only_output_is_day() {
        assert_eq!(Appearance::from_interface_style(b"  \n"), Appearance::Day);
    }

    #[test]
    fn test_any_non_blank_output_is_night() {
        // The query only prints when a style is set, whatever its value.
        assert_eq!(Appearance::from_interface_style(b"Graphite"), Appearance::Night);
    }

    #[test]
    fn test_key_matches_block_names() {
        assert_eq!(Appearance::Day.key(), "day");
        assert_eq!(Appearance::Night.key(), "night");
    }

    #[test]
    fn test_default_is_day() {
        assert_eq!(Appearance::default(), Appearance::Day);
    }

    #[test]
    fn test_from_str_accepts_mode_names_and_aliases() {
        assert_eq!("day".parse::<Appearance>(), Ok(Appearance::Day));
        assert_eq!("Night".parse::<Appearance>(), Ok(Appearance::Night));
        assert_eq!("light".parse::<Appearance>(), Ok(Appearance::Day));
        assert_eq!("DARK".parse::<Appearance>(), Ok(Appearance::Night));
    }

    #[test]
    fn test_from_str_rejects_unknown_names() {
        let err = "dusk".parse::<Appearance>().unwrap_err();
        assert_eq!(err, ParseAppearanceError("dusk".to_string()));
        assert!(err.to_string().contains("dusk"));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for mode in Appearance::ALL {
            assert_eq!(mode.to_string().parse::<Appearance>(), Ok(mode));
        }
    }
}
