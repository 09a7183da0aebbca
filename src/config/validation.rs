//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delay bounds ordered)
//! - Check every endpoint base URL is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatchConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::endpoints::{Environment, PlatformFamily};
use crate::config::schema::{BackoffStrategy, DispatchConfig};

/// Upper bound on configured retries per call group.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signing.secret_key must not be empty")]
    EmptySecretKey,

    #[error("retry.max_retries {0} exceeds the limit of {limit}", limit = MAX_RETRIES_LIMIT)]
    TooManyRetries(u32),

    #[error("retry.max_delay_ms ({max_ms}) is below retry.base_delay_ms ({base_ms})")]
    InvertedBackoff { base_ms: u64, max_ms: u64 },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("endpoints.{environment} base URL for {family} is invalid: {reason}")]
    InvalidBaseUrl {
        environment: Environment,
        family: PlatformFamily,
        reason: String,
    },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.signing.secret_key.is_empty() {
        errors.push(ValidationError::EmptySecretKey);
    }

    if config.retry.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ValidationError::TooManyRetries(config.retry.max_retries));
    }

    if config.retry.strategy == BackoffStrategy::Exponential
        && config.retry.max_delay_ms < config.retry.base_delay_ms
    {
        errors.push(ValidationError::InvertedBackoff {
            base_ms: config.retry.base_delay_ms,
            max_ms: config.retry.max_delay_ms,
        });
    }

    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("transport.connect_timeout_secs"));
    }
    if config.transport.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("transport.request_timeout_secs"));
    }

    for environment in Environment::ALL {
        for family in PlatformFamily::ALL {
            let raw = config.endpoints.base_url_for(environment, family);
            if let Err(reason) = check_base_url(raw) {
                errors.push(ValidationError::InvalidBaseUrl {
                    environment,
                    family,
                    reason,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("'{}': unsupported scheme '{}'", raw, other)),
    }
}
