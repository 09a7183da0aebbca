use thiserror::Error;

/// An attempt that produced no response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the server.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport's own deadline expired.
    #[error("request timed out")]
    Timeout,

    /// The exchange broke off mid-way.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, unencodable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The underlying client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}
