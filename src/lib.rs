//! Signed, deduplicating HTTP dispatch for API clients.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──▶ Dispatcher::send ──▶ RequestTracker ──(duplicate)──▶ DuplicateRejected
//!                    │                    │
//!                    │               (registered)
//!                    ▼                    ▼
//!              BusyIndicator        Signer + SessionStore + PlatformInfo
//!                                         │  token / signature / platform headers
//!                                         ▼
//!                                     Transport ──(no response)──▶ backoff ──▶ retry
//!                                         │
//!                                    status classify
//!                                         │
//!   caller ◀── Outcome ◀── release registration, end busy signal
//! ```
//!
//! Collaborators are traits injected through [`DispatcherBuilder`]; the
//! crate ships a reqwest transport and simple reference implementations of
//! the rest.

// Core
pub mod dispatch;
pub mod signing;
pub mod transport;

// Collaborators
pub mod busy;
pub mod platform;
pub mod session;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::DispatchConfig;
pub use dispatch::{
    DispatchError, DispatchRequest, Dispatcher, DispatcherBuilder, Method, Outcome, Payload,
    RequestData, RequestDescriptor, RequestTracker,
};
