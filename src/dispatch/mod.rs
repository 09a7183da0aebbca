//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! DispatchRequest
//!     → request.rs (descriptor + fingerprint)
//!     → tracker.rs (reject duplicate / register call group)
//!     → dispatcher.rs (sign, merge headers, transport attempt)
//!     → outcome.rs (classify status)
//!     → on transport failure: backoff, next attempt (same registration)
//!     → release registration, end busy signal
//! ```

pub mod dispatcher;
pub mod outcome;
pub mod request;
pub mod tracker;

pub use dispatcher::{Dispatcher, DispatcherBuilder, PLATFORM_HEADER, SIGNATURE_HEADER, TOKEN_HEADER};
pub use outcome::{classify, DispatchError, DispatchResult, Outcome, Payload};
pub use request::{DispatchRequest, Fingerprint, Method, RequestData, RequestDescriptor};
pub use tracker::{InFlightGuard, RequestTracker};
