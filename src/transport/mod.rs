//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (one attempt)
//!     → OutgoingRequest (method, url, data, merged headers)
//!     → Transport::issue
//!     → TransportResponse (status, decoded body) | TransportError (no response)
//! ```
//!
//! # Design Decisions
//! - One call is one attempt; retries belong to the dispatcher
//! - Any received status is a response, never an error
//! - Timeouts are the transport's own concern and surface as `TransportError`

mod error;
mod http_client;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::dispatch::outcome::Payload;
use crate::dispatch::request::{Method, RequestData};

pub use error::TransportError;
pub use http_client::ReqwestTransport;

/// A fully prepared single attempt.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub data: Option<RequestData>,
    pub headers: HeaderMap,
}

/// A response received from the server, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Payload,
}

/// Issues a single HTTP attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(&self, request: &OutgoingRequest) -> Result<TransportResponse, TransportError>;
}
