//! Client configuration shared by every front end.
//!
//! Values come from `<config_dir>/valentine/config.json` and can be
//! overridden per process by `VALENTINE_*` environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::watcher::MIN_POLL_INTERVAL;
use crate::{Error, Result};

pub const CONFIG_DIR_NAME: &str = "valentine";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_API_BASE_URL: &str = "VALENTINE_API_BASE_URL";
pub const ENV_SHARE_BASE_URL: &str = "VALENTINE_SHARE_BASE_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "VALENTINE_POLL_INTERVAL_SECS";
pub const ENV_DATA_DIR: &str = "VALENTINE_DATA_DIR";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Endpoints and local paths used by the sync client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the versioned snapshot API
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Public site that share links point at
    #[serde(default)]
    pub share_base_url: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Where tokens and the local progress copy are kept
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            share_base_url: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            data_dir: None,
        }
    }
}

/// `<config_dir>/valentine/config.json`
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

impl ClientConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalized()
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let normalized = self.clone().normalized()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `VALENTINE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, e.g. a test map.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_BASE_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(url) = normalize_text_option(lookup(ENV_SHARE_BASE_URL)) {
            self.share_base_url = Some(url);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_POLL_INTERVAL_SECS)) {
            self.poll_interval_secs = raw.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "{ENV_POLL_INTERVAL_SECS} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }
        if let Some(dir) = normalize_text_option(lookup(ENV_DATA_DIR)) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self.normalized()
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Trim values, validate URLs and drop trailing slashes.
    pub fn normalized(mut self) -> Result<Self> {
        self.api_base_url = normalize_http_url(self.api_base_url, "api_base_url")?;
        self.share_base_url = normalize_http_url(self.share_base_url, "share_base_url")?;
        if self.poll_interval_secs < MIN_POLL_INTERVAL.as_secs() {
            return Err(Error::InvalidInput(format!(
                "poll_interval_secs must be at least {}",
                MIN_POLL_INTERVAL.as_secs()
            )));
        }
        self.data_dir = self
            .data_dir
            .filter(|dir| !dir.as_os_str().is_empty());
        Ok(self)
    }
}

fn normalize_http_url(value: Option<String>, field: &str) -> Result<Option<String>> {
    let Some(value) = normalize_text_option(value) else {
        return Ok(None);
    };
    if is_http_url(&value) {
        Ok(Some(value.trim_end_matches('/').to_string()))
    } else {
        Err(Error::InvalidInput(format!(
            "config field '{field}' must include http:// or https://"
        )))
    }
}
