//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{OutgoingRequest, Transport, TransportError, TransportResponse};
use crate::config::TransportConfig;
use crate::dispatch::outcome::Payload;
use crate::dispatch::request::{value_text, Method, RequestData};

/// Production transport using a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn issue(&self, request: &OutgoingRequest) -> Result<TransportResponse, TransportError> {
        let url = Url::parse(&request.url).map_err(|e| {
            TransportError::InvalidRequest(format!("invalid URL '{}': {}", request.url, e))
        })?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if let Some(data) = &request.data {
            builder = if sends_query(&request.method) {
                builder.query(&query_pairs(data))
            } else {
                builder.json(data)
            };
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::trace!(status, bytes = text.len(), "Response received");

        Ok(TransportResponse {
            status,
            body: decode_body(&text),
        })
    }
}

/// Methods whose parameters travel in the query string.
fn sends_query(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE || *method == Method::HEAD
}

fn query_pairs(data: &RequestData) -> Vec<(&str, String)> {
    data.iter()
        .map(|(key, value)| (key.as_str(), value_text(value).into_owned()))
        .collect()
}

/// JSON bodies decode to their value; anything else becomes a JSON string.
fn decode_body(text: &str) -> Payload {
    if text.is_empty() {
        return Payload::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Payload::String(text.to_string()))
}
