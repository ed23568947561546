use std::time::Duration;

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 8080;
/// Default location retention window (hours).
const DEFAULT_RETENTION_HOURS: u64 = 24;
/// Longest accepted retention window (hours), ten years.
const MAX_RETENTION_HOURS: u64 = 10 * 365 * 24;
/// Default outbound weather request timeout (seconds).
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPEN_URL not set")]
    OpenUrlNotSet,

    #[error("OPEN_KEY not set")]
    OpenKeyNotSet,
}

/// Deployment environment; selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// One of "debug", "info", "warn", "error"
    pub log_level: String,
    pub environment: Environment,
    /// OpenWeather current weather endpoint
    pub open_url: String,
    pub open_key: String,
    pub provider_timeout: Duration,
    /// Location retention window; also the session cookie max-age and (capped at a week) the sweep interval.
    pub data_retention: Duration,
    /// Key material for signing the session cookie. A random key is used when unset.
    pub session_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Invalid optional values fall back to their defaults; only the provider
    /// URL and key are mandatory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = non_empty("PORT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let log_level = match non_empty("LOG_LEVEL").as_deref() {
            Some(level @ ("debug" | "info" | "warn" | "error")) => level.to_string(),
            _ => "info".to_string(),
        };

        let environment = match non_empty("ENV").as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        let open_url = non_empty("OPEN_URL").ok_or(ConfigError::OpenUrlNotSet)?;
        let open_key = non_empty("OPEN_KEY").ok_or(ConfigError::OpenKeyNotSet)?;

        let provider_timeout_secs = positive_u64(non_empty("PROVIDER_TIMEOUT_SECS"))
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS);
        let retention_secs = positive_u64(non_empty("DATA_RETENTION_HOURS"))
            .filter(|&hours| hours <= MAX_RETENTION_HOURS)
            .and_then(|hours| hours.checked_mul(3600))
            .unwrap_or(DEFAULT_RETENTION_HOURS * 3600);

        Ok(Self {
            port,
            log_level,
            environment,
            open_url,
            open_key,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            data_retention: Duration::from_secs(retention_secs),
            session_secret: non_empty("SESSION_SECRET"),
        })
    }
}

fn positive_u64(value: Option<String>) -> Option<u64> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
}
