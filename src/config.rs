// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-level settings: enablement and record destination.
//!
//! Settings resolve in layers, later layers winning: built-in defaults, then
//! a global settings file (`~/.tapline/settings.yaml`), then a workspace
//! settings file, then environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `TAPLINE_ENABLED` | `true`/`false` — gate record emission |
//! | `TAPLINE_DESTINATION` | `stderr`, `stdout`, `file`, or `memory` |
//! | `TAPLINE_LOG_FILE` | Record file path (required for `file`) |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sink::{ConsoleSink, FileSink, MemorySink, Sink};

/// Settings file names to search for in a workspace (in order).
pub const SETTINGS_FILES: &[&str] = &["tapline.yaml", "tapline.yml", "tapline.json"];

/// Global settings directory name under the home directory.
pub const GLOBAL_SETTINGS_DIR: &str = ".tapline";

/// Global settings file name.
pub const GLOBAL_SETTINGS_FILE: &str = "settings.yaml";

/// Where call records are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// One line per record on stderr.
    #[default]
    Stderr,
    /// One line per record on stdout.
    Stdout,
    /// JSON lines appended to a file.
    File,
    /// Retained in memory (tests, demos).
    Memory,
}

/// Error type for parsing a destination from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseDestinationError;

impl std::fmt::Display for ParseDestinationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid destination")
    }
}

impl std::error::Error for ParseDestinationError {}

impl FromStr for Destination {
    type Err = ParseDestinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stderr" => Ok(Self::Stderr),
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            _ => Err(ParseDestinationError),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Stdout => write!(f, "stdout"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// A partial settings layer; unset fields defer to lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl SettingsOverlay {
    /// Read a layer from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = match std::env::var("TAPLINE_ENABLED") {
            Ok(raw) => Some(parse_bool("TAPLINE_ENABLED", &raw)?),
            Err(_) => None,
        };

        let destination = match std::env::var("TAPLINE_DESTINATION") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "TAPLINE_DESTINATION".to_string(),
                message: format!("unknown destination: {raw}"),
            })?),
            Err(_) => None,
        };

        let log_file = std::env::var("TAPLINE_LOG_FILE").ok().map(PathBuf::from);

        Ok(Self {
            enabled,
            destination,
            log_file,
        })
    }

    /// Read a layer from a YAML or JSON file (by extension).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
            _ => serde_json::from_str(&content).map_err(ConfigError::from),
        }
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("expected a boolean, got: {raw}"),
        }),
    }
}

/// Fully resolved process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Whether records are emitted at all.
    pub enabled: bool,

    /// Where records go.
    pub destination: Destination,

    /// Record file path, for the file destination.
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            destination: Destination::Stderr,
            log_file: None,
        }
    }
}

impl Settings {
    /// Apply overlays over the defaults, in order, later overlays winning.
    pub fn resolve(overlays: impl IntoIterator<Item = SettingsOverlay>) -> Self {
        let mut settings = Self::default();
        for overlay in overlays {
            if let Some(enabled) = overlay.enabled {
                settings.enabled = enabled;
            }
            if let Some(destination) = overlay.destination {
                settings.destination = destination;
            }
            if let Some(log_file) = overlay.log_file {
                settings.log_file = Some(log_file);
            }
        }
        settings
    }

    /// Resolve from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::resolve([SettingsOverlay::from_env()?]))
    }

    /// Resolve from all layers: defaults, global file, workspace file, env.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let mut overlays = Vec::new();

        if let Some(path) = global_settings_path() {
            if path.exists() {
                overlays.push(SettingsOverlay::from_file(&path)?);
            }
        }

        for filename in SETTINGS_FILES {
            let path = workspace_root.join(filename);
            if path.exists() {
                overlays.push(SettingsOverlay::from_file(&path)?);
                break;
            }
        }

        overlays.push(SettingsOverlay::from_env()?);

        Ok(Self::resolve(overlays))
    }

    /// Build the sink this configuration describes.
    pub fn build_sink(&self) -> Result<Arc<dyn Sink>, ConfigError> {
        match self.destination {
            Destination::Stderr => Ok(Arc::new(ConsoleSink::stderr())),
            Destination::Stdout => Ok(Arc::new(ConsoleSink::stdout())),
            Destination::Memory => Ok(Arc::new(MemorySink::new())),
            Destination::File => {
                let path = self
                    .log_file
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingField("log_file".to_string()))?;
                let sink = FileSink::create(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

/// Get the global settings file path.
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_SETTINGS_DIR).join(GLOBAL_SETTINGS_FILE))
}
