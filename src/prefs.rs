//! User preferences: a small key-value file separate from the main config.
//!
//! Unlike `config.toml`, which is tuning, these are values the user sets
//! from inside the app (settings view). Read once at startup, written only
//! on explicit save.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Preferences {
    /// Daily reminder time as "HH:MM", or none for no reminder.
    #[serde(default)]
    pub reminder_time: Option<String>,

    #[serde(default)]
    pub theme: Theme,
}

impl Preferences {
    pub fn load() -> Self {
        let path = Self::prefs_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Malformed prefs file, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::prefs_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn prefs_path() -> PathBuf {
        Config::config_dir().join("prefs.json")
    }
}

/// Loose "HH:MM" check for the reminder time input.
pub fn is_valid_time(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    let (Ok(h), Ok(m)) = (h.parse::<u32>(), m.parse::<u32>()) else {
        return false;
    };
    h < 24 && m < 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_time() {
        assert!(is_valid_time("20:00"));
        assert!(is_valid_time("0:5"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("12:60"));
        assert!(!is_valid_time("noon"));
        assert!(!is_valid_time("12"));
    }

    #[test]
    fn test_prefs_json_round_trip() {
        let prefs = Preferences {
            reminder_time: Some("20:00".to_string()),
            theme: Theme::Light,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        let parsed: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.reminder_time.as_deref(), Some("20:00"));
        assert_eq!(parsed.theme, Theme::Light);
    }

    #[test]
    fn test_missing_fields_default() {
        let parsed: Preferences = serde_json::from_str("{}").unwrap();
        assert!(parsed.reminder_time.is_none());
        assert_eq!(parsed.theme, Theme::Dark);
    }
}
