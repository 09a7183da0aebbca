//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::config::endpoints::EndpointConfig;

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Retry budget and backoff.
    pub retry: RetryConfig,

    /// Request signing settings.
    pub signing: SigningConfig,

    /// HTTP transport settings.
    pub transport: TransportConfig,

    /// Busy indicator settings.
    pub busy: BusyConfig,

    /// Per-environment API base URLs.
    pub endpoints: EndpointConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// How retry delays grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt when a request sets none.
    pub max_retries: u32,

    /// Delay growth strategy.
    pub strategy: BackoffStrategy,

    /// Fixed delay, or base delay for exponential backoff, in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to exponential delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            strategy: BackoffStrategy::Fixed,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: false,
        }
    }
}

/// Signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared secret appended to the canonical query before hashing.
    pub secret_key: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            secret_key: "YOUR_SECRET_KEY".to_string(),
        }
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-attempt timeout in seconds.
    pub request_timeout_secs: u64,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            user_agent: concat!("signed-dispatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Busy indicator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusyConfig {
    /// Message passed to the indicator when a call group starts.
    pub message: String,
}

impl Default for BusyConfig {
    fn default() -> Self {
        Self {
            message: "Loading...".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
