//! Configuration module for loading environment variables and settings.

use crate::error::ConfigError;
use std::fmt;

/// Default base URL for the Together AI REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.together.xyz/v1";

/// Environment variable holding the Together AI API key.
pub const API_KEY_VAR: &str = "TOGETHER_API_KEY";

/// Environment variable overriding the API base URL.
pub const API_BASE_URL_VAR: &str = "TOGETHER_API_BASE_URL";

/// Application configuration loaded from environment variables.
///
/// The API key is read-only for the life of the process and is shared by
/// every invocation.
#[derive(Clone)]
pub struct Config {
    /// Together AI API key (required)
    pub api_key: String,
    /// Base URL of the Together AI REST API
    pub api_base_url: String,
}

impl Config {
    /// Create a configuration with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (used to point at a mock upstream).
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if TOGETHER_API_KEY is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// A blank API key is treated the same as a missing one.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if the API key is absent or blank,
    /// and `ConfigError::InvalidValue` if the base URL is not an http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::missing_env_var(API_KEY_VAR))?;

        let api_base_url = lookup(API_BASE_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !(api_base_url.starts_with("https://") || api_base_url.starts_with("http://")) {
            return Err(ConfigError::invalid_value(
                API_BASE_URL_VAR,
                format!("'{}' must start with http:// or https://", api_base_url),
            ));
        }

        Ok(Self {
            api_key,
            api_base_url,
        })
    }

    /// Get the image generation endpoint URL.
    pub fn images_endpoint(&self) -> String {
        format!("{}/images/generations", self.api_base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}
