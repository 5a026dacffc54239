//! Configuration for termscreen.
//!
//! Settings are read from `~/.termscreen/config.toml`. Every field is
//! optional; a missing or unreadable file yields the defaults.
//!
//! ```toml
//! # Keep whatever is on the terminal instead of clearing it at startup
//! preserve_screen = false
//!
//! # Switch to the alternate screen while a session is live
//! alternate_screen = true
//!
//! # Cursor shape while a session is live: default, blinking-block,
//! # steady-block, blinking-underline, steady-underline, blinking-bar,
//! # steady-bar
//! cursor = "steady-block"
//!
//! [slk]
//! enabled = true
//! # 0 = 3-2-3, 1 = 4-4, 2 = 4-4-4, 3 = 4-4-4 with index line, 55 = 5-5
//! format = 1
//! anchor = "bottom"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::driver::CursorShape;
use crate::core::layout::{Side, SlkPlacement};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read or write config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config path")]
    NoConfigDir,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Suppress the initial clear on create
    pub preserve_screen: bool,
    /// Use the alternate screen (crossterm driver only)
    pub alternate_screen: bool,
    /// Cursor shape applied on create
    pub cursor: Option<CursorShape>,
    /// Soft label key strip
    pub slk: SlkConfig,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            preserve_screen: false,
            alternate_screen: true,
            cursor: None,
            slk: SlkConfig::default(),
        }
    }
}

/// Soft label key configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlkConfig {
    pub enabled: bool,
    pub format: u8,
    pub anchor: Side,
}

impl Default for SlkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: 1,
            anchor: Side::Bottom,
        }
    }
}

impl ScreenConfig {
    /// Load configuration from the default location
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Placement of the slk strip once it is initialized with `rows` rows
    pub fn slk_placement(&self, rows: u16) -> SlkPlacement {
        SlkPlacement {
            rows,
            anchor: self.slk.anchor,
        }
    }

    /// `~/.termscreen`
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".termscreen"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ScreenConfig::from_toml_str("").unwrap(), ScreenConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = ScreenConfig::from_toml_str(
            r#"
            preserve_screen = true
            alternate_screen = false
            cursor = "steady-bar"

            [slk]
            enabled = true
            format = 3
            anchor = "top"
            "#,
        )
        .unwrap();

        assert!(config.preserve_screen);
        assert!(!config.alternate_screen);
        assert_eq!(config.cursor, Some(CursorShape::SteadyBar));
        assert_eq!(
            config.slk,
            SlkConfig {
                enabled: true,
                format: 3,
                anchor: Side::Top,
            }
        );
        assert_eq!(config.slk_placement(2), SlkPlacement { rows: 2, anchor: Side::Top });
    }

    #[test]
    fn test_invalid_anchor_rejected() {
        let err = ScreenConfig::from_toml_str("[slk]\nanchor = \"left\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = ScreenConfig::default();
        config.slk.enabled = true;
        config.cursor = Some(CursorShape::BlinkingUnderline);

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(ScreenConfig::from_toml_str(&text).unwrap(), config);
    }
}
