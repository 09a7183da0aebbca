//! Request identity.
//!
//! # Responsibilities
//! - Describe a logical call (method, URL, parameters)
//! - Derive the fingerprint used as the in-flight deduplication key
//! - Carry per-call options (caller headers, retry budget)
//!
//! # Design Decisions
//! - `RequestData` is a `BTreeMap`, so parameters serialize in key order and
//!   payloads that differ only in insertion order share one fingerprint
//! - Absent parameters serialize to the empty string

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

pub use reqwest::Method;
use serde_json::Value;

/// Request parameters, sorted by key. Values are expected to be scalars.
pub type RequestData = BTreeMap<String, Value>;

const FINGERPRINT_SEPARATOR: &str = "&";

/// Deduplication key of a call group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a logical request. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    data: Option<RequestData>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>, data: Option<RequestData>) -> Self {
        Self {
            method,
            url: url.into(),
            data,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> Option<&RequestData> {
        self.data.as_ref()
    }

    /// `method & url & serialized-data`.
    pub fn fingerprint(&self) -> Fingerprint {
        let body = match &self.data {
            // String keys and JSON values always serialize.
            Some(data) => serde_json::to_string(data).unwrap_or_default(),
            None => String::new(),
        };
        Fingerprint(
            [self.method.as_str(), self.url.as_str(), body.as_str()].join(FINGERPRINT_SEPARATOR),
        )
    }
}

/// Text form of a parameter value as it appears in signatures and query strings.
///
/// Strings are used verbatim; every other value uses its JSON rendering.
pub(crate) fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// A call submitted to the dispatcher.
///
/// # Examples
///
/// ```
/// use signed_dispatch::{DispatchRequest, Method};
///
/// let request = DispatchRequest::new(Method::POST, "https://api.example.com/orders")
///     .param("sku", "A-100")
///     .param("qty", 2)
///     .header("x-trace", "on")
///     .max_retries(1);
/// assert_eq!(request.descriptor().fingerprint().as_str(),
///     r#"POST&https://api.example.com/orders&{"qty":2,"sku":"A-100"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub url: String,
    pub data: Option<RequestData>,
    /// Caller-supplied headers. `token`, `signature` and `platform` entries
    /// are replaced by the dispatcher.
    pub headers: Vec<(String, String)>,
    /// Retries after the first attempt. `None` uses the dispatcher default.
    pub max_retries: Option<u32>,
}

impl DispatchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            data: None,
            headers: Vec::new(),
            max_retries: None,
        }
    }

    /// Replace the request parameters.
    #[must_use]
    pub fn data(mut self, data: RequestData) -> Self {
        self.data = Some(data);
        self
    }

    /// Add a single request parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(RequestData::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor::new(self.method.clone(), self.url.clone(), self.data.clone())
    }
}
