use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_GEOCODER_ENDPOINT, DEFAULT_REQUESTS_PER_MIN,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT, MAX_GEOCODE_ATTEMPTS,
};
use crate::error::{DemographicsError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub retry: RetryConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// `0` disables request throttling.
    pub requests_per_min: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            requests_per_min: DEFAULT_REQUESTS_PER_MIN,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    /// Treat a confirmed "no match" as final instead of retrying it.
    pub stop_on_no_match: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_GEOCODE_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
            stop_on_no_match: true,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub pushgateway_url: Option<String>,
}

impl Config {
    /// Loads configuration from `$VOTER_DEMOGRAPHICS_CONFIG`, else `config.toml`
    /// if present, else defaults. Environment overrides are applied last.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DemographicsError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(endpoint) = non_empty_env("GEOCODER_ENDPOINT") {
            self.geocoder.endpoint = endpoint;
        }
        if let Some(agent) = non_empty_env("GEOCODER_USER_AGENT") {
            self.geocoder.user_agent = agent;
        }
        if let Some(url) = non_empty_env("VOTER_DEMOGRAPHICS_PUSHGATEWAY_URL") {
            self.metrics.pushgateway_url = Some(url);
        }
    }

    /// Rejects settings the geocoder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.geocoder.user_agent.trim().is_empty() {
            return Err(DemographicsError::Config(
                "geocoder.user_agent must not be empty".into(),
            ));
        }
        reqwest::Url::parse(&self.geocoder.endpoint).map_err(|e| {
            DemographicsError::Config(format!(
                "geocoder.endpoint '{}' is not a valid URL: {}",
                self.geocoder.endpoint, e
            ))
        })?;
        if self.geocoder.timeout_seconds == 0 {
            return Err(DemographicsError::Config(
                "geocoder.timeout_seconds must be at least 1".into(),
            ));
        }
        if !(1..=MAX_GEOCODE_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(DemographicsError::Config(format!(
                "retry.max_attempts must be between 1 and {}, got {}",
                MAX_GEOCODE_ATTEMPTS, self.retry.max_attempts
            )));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
