//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Path appended to `server` when no explicit endpoint is configured.
pub const DEFAULT_EVENT_PATH: &str = "/event/";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Full URL of the collection endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Collector origin (e.g. `https://collector.example`), used when
    /// `endpoint` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Request timeout for flushes, in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            server: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // EVT_ENDPOINT, EVT_SERVER, EVT_TIMEOUT_SECS
        figment = figment.merge(Env::prefixed("EVT_"));

        figment.extract()
    }

    /// The collection endpoint, if one can be determined.
    ///
    /// An explicit `endpoint` wins; otherwise `server` is joined with
    /// [`DEFAULT_EVENT_PATH`].
    pub fn resolve_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            return Some(endpoint.to_string());
        }
        self.server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|server| format!("{}{DEFAULT_EVENT_PATH}", server.trim_end_matches('/')))
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns the platform-specific config directory for evt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("evt"))
}
