//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and addresses. All problems
//! are collected so an operator sees every mistake in one pass.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BucketConfig, GateConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.{bucket}.capacity must be greater than zero")]
    ZeroCapacity { bucket: &'static str },

    #[error("rate_limit.{bucket}.refill_interval_ms must be greater than zero")]
    ZeroInterval { bucket: &'static str },

    #[error("backend.{0} must not be empty")]
    EmptyRpcName(&'static str),

    #[error("{section}.request_timeout_secs must be greater than zero")]
    ZeroTimeout { section: &'static str },
}

/// Validate a parsed configuration.
///
/// An unparseable `backend.base_url` is deliberately not reported here: it only
/// disables origin derivation.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    check_bucket("login", &config.rate_limit.login, &mut errors);
    check_bucket("verify_code", &config.rate_limit.verify_code, &mut errors);

    if config.backend.login_rpc.trim().is_empty() {
        errors.push(ValidationError::EmptyRpcName("login_rpc"));
    }
    if config.backend.verify_rpc.trim().is_empty() {
        errors.push(ValidationError::EmptyRpcName("verify_rpc"));
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { section: "backend" });
    }
    if config.security.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { section: "security" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bucket(name: &'static str, bucket: &BucketConfig, errors: &mut Vec<ValidationError>) {
    if bucket.capacity == 0 {
        errors.push(ValidationError::ZeroCapacity { bucket: name });
    }
    if bucket.refill_interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval { bucket: name });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GateConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GateConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.login.capacity = 0;
        config.rate_limit.verify_code.refill_interval_ms = 0;
        config.backend.verify_rpc = " ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroCapacity { bucket: "login" }));
        assert!(errors.contains(&ValidationError::ZeroInterval { bucket: "verify_code" }));
        assert!(errors.contains(&ValidationError::EmptyRpcName("verify_rpc")));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = GateConfig::default();
        config.backend.request_timeout_secs = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroTimeout { section: "backend" }]
        );

        config.security.request_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[1].to_string(),
            "security.request_timeout_secs must be greater than zero"
        );
    }

    #[test]
    fn test_bad_backend_url_is_not_an_error() {
        let mut config = GateConfig::default();
        config.backend.base_url = "::not a url::".into();
        assert!(validate_config(&config).is_ok());
    }
}
