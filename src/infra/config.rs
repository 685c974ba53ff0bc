use std::time::Duration;
use thiserror::Error;

pub const REFRESH_MS_ENV: &str = "CALLWATCH_REFRESH_MS";
pub const SPINNER_MS_ENV: &str = "CALLWATCH_SPINNER_MS";
pub const LOG_FILTER_ENV: &str = "CALLWATCH_LOG";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_SPINNER_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MonitorConfig {
    /// How often the active tab is recomputed from the store.
    pub refresh_interval: Duration,
    pub spinner_interval: Duration,
    pub log_filter: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            spinner_interval: DEFAULT_SPINNER_INTERVAL,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value} (expected a positive number of milliseconds)")]
    InvalidInterval { name: &'static str, value: String },
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let refresh_interval =
            read_interval(&lookup, REFRESH_MS_ENV)?.unwrap_or(defaults.refresh_interval);
        let spinner_interval =
            read_interval(&lookup, SPINNER_MS_ENV)?.unwrap_or(defaults.spinner_interval);
        let log_filter = lookup(LOG_FILTER_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            refresh_interval,
            spinner_interval,
            log_filter,
        })
    }
}

fn read_interval(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidInterval { name, value: raw }),
        Ok(millis) => Ok(Some(Duration::from_millis(millis))),
    }
}
