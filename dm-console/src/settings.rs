//! Operator settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dm_router::{RouterConfig, SlotOffsetConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Saved console settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Switch connection and calibration
    #[serde(default)]
    pub switch: RouterConfig,
}

/// Command-line values that take precedence over the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub calibration: Option<SlotOffsetConfig>,
}

impl Settings {
    /// Get the XDG config directory for dmctl
    /// Uses $XDG_CONFIG_HOME/dmctl, falls back to ~/.config/dmctl
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("dmctl"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("dmctl"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default path; a missing or unreadable file
    /// gives defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::parse(&text).unwrap_or_else(|e| {
            warn!("Ignoring settings in {}: {}", path.display(), e);
            Self::default()
        })
    }

    fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Load settings from an explicit file, which must exist and parse
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Save settings to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.switch.host = host;
        }
        if let Some(port) = overrides.port {
            self.switch.port = port;
        }
        if overrides.calibration.is_some() {
            self.switch.calibration = overrides.calibration;
        }
    }
}
