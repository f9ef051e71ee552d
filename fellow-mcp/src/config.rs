//! Fellow API configuration.
//!
//! Provides the immutable configuration shared by every request: workspace
//! subdomain, API key, base URL, timeout, and the retry/pagination policies.
//! Configuration is built explicitly or loaded from environment variables and
//! never mutated after construction.

use crate::pagination::PagePolicy;
use crate::retry::RetryPolicy;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Fellow workspace subdomain.
pub const ENV_SUBDOMAIN: &str = "FELLOW_SUBDOMAIN";

/// Environment variable holding the Fellow API key.
pub const ENV_API_KEY: &str = "FELLOW_API_KEY";

/// Optional environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "FELLOW_BASE_URL";

/// Per-attempt request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for the Fellow API client.
#[derive(Clone)]
pub struct FellowConfig {
    /// Workspace subdomain (`{subdomain}.fellow.app`).
    pub subdomain: String,

    /// API key sent in the `X-API-KEY` header.
    pub api_key: String,

    /// Base URL for the API. Derived from the subdomain unless overridden.
    pub base_url: String,

    /// Request timeout in seconds, applied to each attempt.
    pub timeout_secs: u64,

    /// Retry policy for outbound calls.
    pub retry: RetryPolicy,

    /// Pagination policy for list endpoints.
    pub pages: PagePolicy,
}

impl fmt::Debug for FellowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FellowConfig")
            .field("subdomain", &self.subdomain)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .field("pages", &self.pages)
            .finish()
    }
}

impl FellowConfig {
    /// Create a configuration for a workspace with default policies.
    ///
    /// Both values must be non-empty.
    pub fn new(
        subdomain: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let subdomain = subdomain.into().trim().to_string();
        let api_key = api_key.into().trim().to_string();

        if subdomain.is_empty() {
            return Err(ConfigError::MissingEnvVar(ENV_SUBDOMAIN.to_string()));
        }
        if api_key.is_empty() {
            return Err(ConfigError::MissingEnvVar(ENV_API_KEY.to_string()));
        }
        if subdomain.contains(['/', ':', '?', '#', ' ']) {
            return Err(ConfigError::InvalidValue {
                key: ENV_SUBDOMAIN.to_string(),
                message: format!("'{}' is not a valid subdomain", subdomain),
            });
        }

        Ok(Self {
            base_url: format!("https://{}.fellow.app", subdomain),
            subdomain,
            api_key,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            pages: PagePolicy::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FELLOW_SUBDOMAIN`: workspace subdomain (required)
    /// - `FELLOW_API_KEY`: API key (required)
    /// - `FELLOW_BASE_URL`: base URL override (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let subdomain = std::env::var(ENV_SUBDOMAIN)
            .map_err(|_| ConfigError::MissingEnvVar(ENV_SUBDOMAIN.to_string()))?;
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| ConfigError::MissingEnvVar(ENV_API_KEY.to_string()))?;

        let config = Self::new(subdomain, api_key)?;
        match std::env::var(ENV_BASE_URL) {
            Ok(base_url) if !base_url.trim().is_empty() => config.with_base_url(base_url),
            _ => Ok(config),
        }
    }

    /// Override the base URL (staging deployments, local mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: ENV_BASE_URL.to_string(),
                message: format!("'{}' must start with http:// or https://", base_url),
            });
        }
        self.base_url = base_url;
        Ok(self)
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pagination policy.
    pub fn with_pages(mut self, pages: PagePolicy) -> Self {
        self.pages = pages;
        self
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}
