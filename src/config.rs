//! Application-level configuration loading for poll defaults and runtime limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLASSROOM_POLL_CONFIG_PATH";

const DEFAULT_POLL_DURATION_SECS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_duration_secs: u64,
    store_timeout: Duration,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        default_duration_secs = app_config.default_duration_secs,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Voting window applied when a creation request omits the duration.
    pub fn default_duration_secs(&self) -> u64 {
        self.default_duration_secs
    }

    /// Upper bound for a single store call on the lifecycle critical path.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Buffer size of the public SSE broadcast channel.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_duration_secs: u64,
    store_timeout_ms: u64,
    sse_capacity: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_POLL_DURATION_SECS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            // A zero duration would close polls before anyone could vote.
            default_duration_secs: value.default_duration_secs.max(1),
            store_timeout: Duration::from_millis(value.store_timeout_ms.max(1)),
            sse_capacity: value.sse_capacity.max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_duration_secs(), 60);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let config = AppConfig::from_json(r#"{"default_duration_secs": 90}"#).unwrap();
        assert_eq!(config.default_duration_secs(), 90);
        assert_eq!(config.sse_capacity(), DEFAULT_SSE_CAPACITY);
    }

    #[test]
    fn zero_values_are_clamped() {
        let config =
            AppConfig::from_json(r#"{"default_duration_secs": 0, "sse_capacity": 0}"#).unwrap();
        assert_eq!(config.default_duration_secs(), 1);
        assert_eq!(config.sse_capacity(), 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json("[1, 2").is_err());
    }
}
