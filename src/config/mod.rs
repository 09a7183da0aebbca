//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated, immutable)
//!     → DispatcherBuilder::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Endpoint selection is a static table lookup

pub mod endpoints;
pub mod loader;
pub mod schema;
pub mod validation;

pub use endpoints::{BaseUrls, EndpointConfig, Environment, PlatformFamily};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackoffStrategy, BusyConfig, DispatchConfig, ObservabilityConfig, RetryConfig, SigningConfig,
    TransportConfig,
};
pub use validation::{validate_config, ValidationError};
