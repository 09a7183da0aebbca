//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Transport attempt fails (no response):
//!     → dispatcher checks remaining retry budget
//!     → backoff.rs (delay before the next attempt)
//!     → same call group re-issues the request
//! ```
//!
//! # Design Decisions
//! - Only transport failures are retried; every received status is final
//! - Default delay is a fixed one second; exponential with jitter is opt-in
//! - Backoff suspends only the retrying call group

pub mod backoff;

pub use backoff::BackoffPolicy;
