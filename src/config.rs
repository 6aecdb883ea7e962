//! Connection settings for the clustering service.
//!
//! Settings come from command-line options first, then `CLUSTERCTL_*`
//! environment variables, then built-in defaults.

use std::time::Duration;

use thiserror::Error;

/// Base URL used when neither an option nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8778";

/// Environment variable holding the service base URL.
pub const ENV_BASE_URL: &str = "CLUSTERCTL_URL";
/// Environment variable holding the auth token.
pub const ENV_TOKEN: &str = "CLUSTERCTL_TOKEN";
/// Environment variable holding the project ID.
pub const ENV_PROJECT: &str = "CLUSTERCTL_PROJECT";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "CLUSTERCTL_TIMEOUT";

/// Errors raised while assembling a [`ClientConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL is not an http(s) URL.
    #[error("invalid base URL '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),
    /// The timeout is not a positive number of seconds.
    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),
}

/// Settings needed to reach the clustering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service endpoint without the API version suffix.
    pub base_url: String,
    /// Value for the `X-Auth-Token` header.
    pub token: Option<String>,
    /// Value for the `X-Project-Id` header.
    pub project: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            project: None,
            timeout: None,
        }
    }
}

/// Raw settings as given on the command line; empty means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--base-url`
    pub base_url: String,
    /// `--token`
    pub token: String,
    /// `--project`
    pub project: String,
    /// `--timeout`
    pub timeout: String,
}

impl ClientConfig {
    /// Builds the configuration from options and the process environment.
    pub fn from_overrides(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from options and an arbitrary variable lookup.
    pub fn resolve<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |given: &str, key: &str| -> Option<String> {
            if given.is_empty() {
                lookup(key).filter(|v| !v.trim().is_empty())
            } else {
                Some(given.to_string())
            }
        };

        let base_url = pick(&overrides.base_url, ENV_BASE_URL)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        let timeout = match pick(&overrides.timeout, ENV_TIMEOUT) {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        Ok(Self {
            base_url,
            token: pick(&overrides.token, ENV_TOKEN),
            project: pick(&overrides.project, ENV_PROJECT),
            timeout,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
