//! Configuration management for the monitor.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::reducer::{RefreshConfig, RefreshMode};
use crate::seatsio::DEFAULT_BASE_URL;
use seatwatch_runtime::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from reading the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid value for {name}: '{value}'")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// seats.io configuration
    pub seatsio: SeatsioConfig,
    /// Path of the JSON event catalog
    pub catalog_path: PathBuf,
    /// Refresh scheduling, timeout and retries
    pub refresh: RefreshConfig,
    /// Age after which an entry is refreshed again
    pub stale_after: chrono::Duration,
    /// Refresh stale entries on this interval; `None` runs once and exits
    pub watch_interval: Option<Duration>,
    /// Prometheus exporter port; `None` disables the exporter
    pub metrics_port: Option<u16>,
}

/// seats.io configuration
#[derive(Clone, PartialEq, Eq)]
pub struct SeatsioConfig {
    /// Workspace secret key
    pub secret_key: String,
    /// API region endpoint
    pub base_url: String,
}

impl std::fmt::Debug for SeatsioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatsioConfig")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SEATSIO_SECRET_KEY` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let secret_key = vars
            .get("SEATSIO_SECRET_KEY")
            .ok_or(ConfigError::Missing("SEATSIO_SECRET_KEY"))?;

        let mode = match vars.get("REFRESH_MODE").as_deref() {
            None | Some("sequential") => RefreshMode::Sequential,
            Some("parallel") => RefreshMode::Parallel {
                max_concurrent: vars.parse("REFRESH_CONCURRENCY")?.unwrap_or(4),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "REFRESH_MODE",
                    value: other.to_string(),
                });
            },
        };

        let retry = RetryPolicy::builder()
            .max_retries(vars.parse("REPORT_MAX_RETRIES")?.unwrap_or(2))
            .build();

        let stale_after = match vars.get("STALE_AFTER_SECS") {
            None => chrono::Duration::seconds(300),
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .and_then(chrono::Duration::try_seconds)
                .ok_or(ConfigError::Invalid {
                    name: "STALE_AFTER_SECS",
                    value,
                })?,
        };

        let timeout_secs: u64 = vars.parse("REPORT_TIMEOUT_SECS")?.unwrap_or(10);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REPORT_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
            });
        }

        Ok(Self {
            seatsio: SeatsioConfig {
                secret_key,
                base_url: vars
                    .get("SEATSIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
            catalog_path: vars
                .get("CATALOG_PATH")
                .map_or_else(|| PathBuf::from("events.json"), PathBuf::from),
            refresh: RefreshConfig {
                mode,
                timeout: Duration::from_secs(timeout_secs),
                retry,
            },
            stale_after,
            watch_interval: vars
                .parse::<u64>("WATCH_INTERVAL_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            metrics_port: vars.parse("METRICS_PORT")?,
        })
    }
}

/// Trimmed, non-empty variable lookup
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name, value })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SEATSIO_SECRET_KEY", "secret")]);

        assert_eq!(
            config,
            Ok(Config {
                seatsio: SeatsioConfig {
                    secret_key: "secret".to_string(),
                    base_url: DEFAULT_BASE_URL.to_string(),
                },
                catalog_path: PathBuf::from("events.json"),
                refresh: RefreshConfig::default(),
                stale_after: chrono::Duration::seconds(300),
                watch_interval: None,
                metrics_port: None,
            })
        );
    }

    #[test]
    fn test_secret_key_is_required() {
        assert_eq!(
            load(&[("SEATSIO_SECRET_KEY", "  ")]),
            Err(ConfigError::Missing("SEATSIO_SECRET_KEY"))
        );
    }

    #[test]
    fn test_parallel_mode() {
        let config = load(&[
            ("SEATSIO_SECRET_KEY", "secret"),
            ("REFRESH_MODE", "parallel"),
            ("REFRESH_CONCURRENCY", "8"),
            ("WATCH_INTERVAL_SECS", "60"),
            ("METRICS_PORT", "9100"),
        ]);

        let config = config.unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(config.refresh.mode, RefreshMode::Parallel { max_concurrent: 8 });
        assert_eq!(config.watch_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert_eq!(
            load(&[("SEATSIO_SECRET_KEY", "secret"), ("REFRESH_MODE", "eager")]),
            Err(ConfigError::Invalid {
                name: "REFRESH_MODE",
                value: "eager".to_string(),
            })
        );
        assert_eq!(
            load(&[("SEATSIO_SECRET_KEY", "secret"), ("REPORT_TIMEOUT_SECS", "ten")]),
            Err(ConfigError::Invalid {
                name: "REPORT_TIMEOUT_SECS",
                value: "ten".to_string(),
            })
        );
    }

    #[test]
    fn test_stale_after_must_be_a_representable_non_negative_duration() {
        for value in ["-1", "9223372036854775807", "soon"] {
            assert_eq!(
                load(&[("SEATSIO_SECRET_KEY", "secret"), ("STALE_AFTER_SECS", value)]),
                Err(ConfigError::Invalid {
                    name: "STALE_AFTER_SECS",
                    value: value.to_string(),
                })
            );
        }

        let config = load(&[("SEATSIO_SECRET_KEY", "secret"), ("STALE_AFTER_SECS", "0")]);
        assert_eq!(
            config.map(|c| c.stale_after),
            Ok(chrono::Duration::zero())
        );
    }

    #[test]
    fn test_zero_report_timeout_is_rejected() {
        assert_eq!(
            load(&[("SEATSIO_SECRET_KEY", "secret"), ("REPORT_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid {
                name: "REPORT_TIMEOUT_SECS",
                value: "0".to_string(),
            })
        );
    }

    #[test]
    fn test_secret_key_is_not_logged() {
        let config =
            load(&[("SEATSIO_SECRET_KEY", "hunter2")]).unwrap_or_else(|e| unreachable!("{e}"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
