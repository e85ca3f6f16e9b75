//! Session settings read from `config.toml`.
//!
//! Every field has a default, so a missing file, a missing `[session]` table
//! or a partial table are all valid.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::refresh::OverlapPolicy;
use crate::watcher::WatchTiming;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    /// Whether next/prev hunk continues into the neighbouring file.
    pub wrap_hunks: bool,
    pub watch_enabled: bool,
    pub refresh_on_save: bool,
    pub overlap_policy: OverlapPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            debounce_ms: 100,
            wrap_hunks: false,
            watch_enabled: true,
            refresh_on_save: true,
            overlap_policy: OverlapPolicy::Queue,
        }
    }
}

impl SessionConfig {
    pub fn timing(&self) -> WatchTiming {
        WatchTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Colour theme name; interpreted by the host.
    pub theme: Option<String>,
    pub session: SessionConfig,
}

impl ConfigFile {
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Reads `path`. A file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        Self::parse(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}
