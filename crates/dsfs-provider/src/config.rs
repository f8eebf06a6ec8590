//! Provider configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! fire_soon_delay_ms = 5
//! status_timeout_ms = 4000
//! fetch_by_default = false
//!
//! [[profiles]]
//! name = "lpar"
//! profile_type = "zosmf"
//! encoding = "IBM-1047"
//! response_timeout = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::profile::{Profile, StaticProfiles};

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for [`DatasetFsProvider`](crate::DatasetFsProvider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Debounce before a batch of change events is delivered.
    pub fire_soon_delay_ms: u64,

    /// How long transient status messages stay visible.
    pub status_timeout_ms: u64,

    /// Probe the remote system when `stat` or `read_directory` misses locally.
    pub fetch_by_default: bool,

    /// Known connection profiles.
    pub profiles: Vec<Profile>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            fire_soon_delay_ms: 5,
            status_timeout_ms: 4000,
            fetch_by_default: false,
            profiles: Vec::new(),
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), profiles = config.profiles.len(), "loaded provider config");
        Ok(config)
    }

    pub fn with_fire_soon_delay(mut self, delay: Duration) -> Self {
        self.fire_soon_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_fetch_by_default(mut self, fetch: bool) -> Self {
        self.fetch_by_default = fetch;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn fire_soon_delay(&self) -> Duration {
        Duration::from_millis(self.fire_soon_delay_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    /// Profile resolver over the configured profiles.
    pub fn static_profiles(&self) -> StaticProfiles {
        self.profiles.iter().cloned().collect()
    }
}
