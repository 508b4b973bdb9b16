//! Runtime configuration for the scanner.
//!
//! Layering: built-in defaults → optional TOML file → `SAFELINK_API_BASE`
//! environment variable. CLI flags are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
pub const API_BASE_ENV: &str = "SAFELINK_API_BASE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Base URL of the classification service, without trailing slash.
    pub api_base: String,
    pub request_timeout_secs: u64,
    /// Upper bound on the one-time QR decoder load.
    pub decoder_load_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            decoder_load_timeout_secs: 10,
        }
    }
}

impl ScannerConfig {
    /// Load defaults, then the TOML file at `path` (if any), then the
    /// environment override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            config.set_api_base(&base);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: ScannerConfig = toml::from_str(text)?;
        let base = config.api_base.clone();
        config.set_api_base(&base);
        Ok(config)
    }

    pub fn set_api_base(&mut self, base: &str) {
        self.api_base = base.trim().trim_end_matches('/').to_string();
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn decoder_load_timeout(&self) -> Duration {
        Duration::from_secs(self.decoder_load_timeout_secs)
    }

    /// Join an endpoint path (e.g. `/scan/url`) onto the API base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}
