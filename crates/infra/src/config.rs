//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `PAYCAST_DEFAULT_REGION` | `US` |
//! | `PAYCAST_DATA_URL` | unset (static tables only) |
//! | `PAYCAST_DATA_TOKEN` | unset |
//! | `PAYCAST_CACHE_TTL_MS` | `300000` |
//! | `PAYCAST_LOAD_TIMEOUT_MS` | `5000` |
//! | `PAYCAST_ALLOW_STALE` | `true` |
//! | `PAYCAST_JOB_RETENTION_SECS` | `3600` |
//! | `PAYCAST_CLEANUP_INTERVAL_SECS` | `600` |

use std::str::FromStr;
use std::time::Duration;

use paycast_core::FALLBACK_REGION;
use paycast_loader::{HttpSourceConfig, LoadOptions};

use crate::jobs::JobQueueConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaycastConfig {
    pub default_region: String,
    pub data_url: Option<String>,
    pub data_token: Option<String>,
    pub cache_ttl_ms: i64,
    pub load_timeout_ms: u64,
    pub allow_stale: bool,
    pub job_retention: Duration,
    pub cleanup_interval: Duration,
}

impl Default for PaycastConfig {
    fn default() -> Self {
        let load = LoadOptions::default();
        let queue = JobQueueConfig::default();
        Self {
            default_region: FALLBACK_REGION.to_string(),
            data_url: None,
            data_token: None,
            cache_ttl_ms: load.ttl_ms,
            load_timeout_ms: load.timeout_ms,
            allow_stale: load.allow_stale,
            job_retention: queue.retention,
            cleanup_interval: queue.cleanup_interval,
        }
    }
}

impl PaycastConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            default_region: get("PAYCAST_DEFAULT_REGION")
                .map(|r| r.to_uppercase())
                .unwrap_or(defaults.default_region),
            data_url: get("PAYCAST_DATA_URL"),
            data_token: get("PAYCAST_DATA_TOKEN"),
            cache_ttl_ms: parse(&get, "PAYCAST_CACHE_TTL_MS")?.unwrap_or(defaults.cache_ttl_ms),
            load_timeout_ms: parse(&get, "PAYCAST_LOAD_TIMEOUT_MS")?
                .unwrap_or(defaults.load_timeout_ms),
            allow_stale: parse_bool(&get, "PAYCAST_ALLOW_STALE")?.unwrap_or(defaults.allow_stale),
            job_retention: parse(&get, "PAYCAST_JOB_RETENTION_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_retention),
            cleanup_interval: parse_positive(&get, "PAYCAST_CLEANUP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        })
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::default()
            .with_ttl_ms(self.cache_ttl_ms)
            .with_timeout_ms(self.load_timeout_ms)
            .with_allow_stale(self.allow_stale)
    }

    pub fn queue_config(&self) -> JobQueueConfig {
        JobQueueConfig::default()
            .with_retention(self.job_retention)
            .with_cleanup_interval(self.cleanup_interval)
    }

    /// HTTP source settings, when a data URL is configured.
    pub fn http_source(&self) -> Option<HttpSourceConfig> {
        let url = self.data_url.as_ref()?;
        let mut config = HttpSourceConfig::new(url.clone()).with_timeout_ms(self.load_timeout_ms);
        if let Some(token) = &self.data_token {
            config = config.with_token(token.clone());
        }
        Some(config)
    }
}

fn parse<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_positive<G>(get: &G, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse::<u64, G>(get, key)? {
        Some(0) => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        other => Ok(other),
    }
}

fn parse_bool<G>(get: &G, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}
