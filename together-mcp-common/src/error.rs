//! Error types for the common library.
//!
//! This module provides a unified error hierarchy using `thiserror` for consistent
//! error handling across the Together MCP servers.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `Error::Api`: Upstream API answered with a non-success status
//! - `Error::Transport`: Upstream API could not be reached or its response not read

use thiserror::Error;

/// Unified error type for the common library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API errors with endpoint and HTTP status context
    ///
    /// `message` holds the message reported by the upstream API, or a
    /// generic description of the status when the body carried none.
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// The request never produced a usable response (DNS, connect, reset).
    #[error("Request to {endpoint} failed: {message}")]
    Transport {
        /// The API endpoint that was called
        endpoint: String,
        /// Low-level failure description
        message: String,
    },
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use together_mcp_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://api.together.xyz/v1/images/generations",
    ///     429,
    ///     "rate limited"
    /// );
    /// assert!(err.to_string().contains("api.together.xyz"));
    /// assert!(err.to_string().contains("429"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new transport error.
    ///
    /// # Example
    ///
    /// ```
    /// use together_mcp_common::error::Error;
    ///
    /// let err = Error::transport("http://127.0.0.1:9/v1", "connection refused");
    /// assert!(err.to_string().contains("connection refused"));
    /// ```
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables or configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_includes_endpoint_and_status() {
        let err = Error::api("https://api.together.xyz/v1/images/generations", 500, "Internal error");
        let msg = err.to_string();
        assert!(msg.contains("api.together.xyz"), "Should contain endpoint");
        assert!(msg.contains("500"), "Should contain status code");
        assert!(msg.contains("Internal error"), "Should contain message");
        assert!(matches!(err, Error::Api { status_code: 500, .. }));
    }

    #[test]
    fn test_transport_error_is_not_api() {
        let err = Error::transport("https://api.together.xyz/v1/images/generations", "dns failure");
        assert!(matches!(err, Error::Transport { .. }));
        assert!(err.to_string().contains("dns failure"));
    }

    #[test]
    fn test_config_error_includes_var_name() {
        let err = ConfigError::missing_env_var("TOGETHER_API_KEY");
        let msg = err.to_string();
        assert!(msg.contains("TOGETHER_API_KEY"), "Should contain variable name");
    }

    #[test]
    fn test_error_from_config_error() {
        let config_err = ConfigError::missing_env_var("TEST_VAR");
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
