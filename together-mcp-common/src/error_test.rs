//! Property-based tests for error module.
//!
//! These tests check that error messages keep the context needed to
//! diagnose an upstream failure.

use proptest::prelude::*;

use crate::error::{ConfigError, Error};

/// Generate valid HTTP status codes (100-599)
fn http_status_strategy() -> impl Strategy<Value = u16> {
    100u16..600u16
}

/// Generate API endpoint URLs
fn endpoint_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("https://[a-z]+\\.together\\.xyz/v[0-9]+/[a-z/]+")
        .unwrap()
        .prop_filter("endpoint must be non-empty", |s| !s.is_empty())
}

/// Generate error messages
fn message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ]{1,100}"
}

proptest! {
    /// API errors include the endpoint, the HTTP status and the upstream message.
    #[test]
    fn api_error_includes_endpoint_and_status(
        endpoint in endpoint_strategy(),
        status_code in http_status_strategy(),
        message in message_strategy()
    ) {
        let err = Error::api(&endpoint, status_code, &message);
        let err_string = err.to_string();

        prop_assert!(
            err_string.contains(&endpoint),
            "API error should include endpoint '{}' in message: {}",
            endpoint,
            err_string
        );
        prop_assert!(
            err_string.contains(&status_code.to_string()),
            "API error should include status code '{}' in message: {}",
            status_code,
            err_string
        );
        prop_assert!(err_string.contains(&message));
    }

    /// Transport errors include the endpoint and never look like API errors.
    #[test]
    fn transport_error_includes_endpoint(
        endpoint in endpoint_strategy(),
        message in message_strategy()
    ) {
        let err = Error::transport(&endpoint, &message);
        prop_assert!(matches!(err, Error::Transport { .. }), "expected Error::Transport, got {:?}", err);
        prop_assert!(err.to_string().contains(&endpoint));
        prop_assert!(err.to_string().contains(&message));
    }

    /// Invalid-value config errors name both the variable and the reason.
    #[test]
    fn config_invalid_value_includes_name_and_reason(
        name in "[A-Z_]{1,30}",
        reason in message_strategy()
    ) {
        let err = ConfigError::invalid_value(&name, &reason);
        let msg = err.to_string();
        prop_assert!(msg.contains(&name));
        prop_assert!(msg.contains(&reason));
    }
}
