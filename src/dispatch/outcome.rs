//! Call outcomes and status classification.

use thiserror::Error;

use crate::dispatch::request::Fingerprint;
use crate::transport::{TransportError, TransportResponse};

/// Decoded response body.
pub type Payload = serde_json::Value;

/// Terminal failure of a call group.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An identical call is already in flight.
    #[error("duplicate request rejected: {0}")]
    DuplicateRejected(Fingerprint),

    /// Server answered 401.
    #[error("authentication failed")]
    Auth,

    /// Server answered 500.
    #[error("server error")]
    Server,

    /// Server answered with a status other than 200, 401 or 500.
    #[error("unexpected HTTP status {0}")]
    UnknownStatus(u16),

    /// No response after every permitted attempt.
    #[error("request failed after {attempts} attempts: {source}")]
    TransportFailure {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// A header could not be encoded for the wire.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl DispatchError {
    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::DuplicateRejected(_) => "duplicate",
            DispatchError::Auth => "auth_error",
            DispatchError::Server => "server_error",
            DispatchError::UnknownStatus(_) => "unknown_status",
            DispatchError::TransportFailure { .. } => "transport_failure",
            DispatchError::InvalidHeader(_) => "invalid_header",
        }
    }
}

/// Settled result of a call group.
pub type Outcome = Result<Payload, DispatchError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

pub(crate) fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(e) => e.label(),
    }
}

/// Map a received response to an outcome. No status is retried.
pub fn classify(response: TransportResponse) -> Outcome {
    match response.status {
        200 => Ok(response.body),
        401 => Err(DispatchError::Auth),
        500 => Err(DispatchError::Server),
        code => Err(DispatchError::UnknownStatus(code)),
    }
}
