use std::env;
use std::time::Duration;

pub const DEFAULT_SENSOR_API_URL: &str = "http://127.0.0.1:5000/latest-readings";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    // Readings source
    pub sensor_api_url: String,
    pub source_timeout_seconds: u64,

    // Refresh loop
    pub poll_interval_ms: u64,
    pub history_capacity: usize,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor_api_url: DEFAULT_SENSOR_API_URL.to_string(),
            source_timeout_seconds: 10,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            disable_rate_limiting: false,
            rate_limit_per_second: 2,
            rate_limit_burst: 30,
        }
    }
}

/// Read an environment variable and parse it, falling back to `default`
/// when it is unset or unparseable.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the poll interval is zero or the
    /// readings URL is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            sensor_api_url: env::var("SENSOR_API_URL").unwrap_or(defaults.sensor_api_url),
            source_timeout_seconds: env_or(
                "SOURCE_TIMEOUT_SECONDS",
                defaults.source_timeout_seconds,
            ),

            poll_interval_ms: env_or("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            history_capacity: env_or("HISTORY_CAPACITY", defaults.history_capacity),

            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_or("API_PORT", defaults.api_port),

            disable_rate_limiting: env_or(
                "DISABLE_RATE_LIMITING",
                defaults.disable_rate_limiting,
            ),
            rate_limit_per_second: env_or(
                "RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            ),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
        };

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for settings the refresh loop cannot
    /// run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sensor_api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "SENSOR_API_URL",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
