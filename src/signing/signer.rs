use std::fmt;

use sha2::{Digest, Sha256};

use crate::dispatch::request::{value_text, RequestData};

/// Produces the `signature` header for a request's parameters.
pub trait Signer: Send + Sync {
    fn sign(&self, data: Option<&RequestData>) -> String;
}

/// Join parameters as `key=value` pairs in key order, separated by `&`.
pub fn canonical_query(data: Option<&RequestData>) -> String {
    let Some(data) = data else {
        return String::new();
    };
    data.iter()
        .map(|(key, value)| format!("{}={}", key, value_text(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex SHA-256 of the canonical string followed by the secret.
pub fn signature(canonical: &str, secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Shared-secret signer.
#[derive(Clone)]
pub struct Sha256Signer {
    secret_key: String,
}

impl Sha256Signer {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Sha256Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sha256Signer")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Signer for Sha256Signer {
    fn sign(&self, data: Option<&RequestData>) -> String {
        signature(&canonical_query(data), &self.secret_key)
    }
}
