//! Request signing.
//!
//! # Data Flow
//! ```text
//! RequestData (sorted)
//!     → canonical_query ("a=1&b=2")
//!     → signature(canonical, secret) (hex SHA-256 of canonical + secret)
//!     → `signature` header
//! ```
//!
//! # Design Decisions
//! - Signing is pure: no storage lookup, no clock, no I/O
//! - The scheme is a shared-secret placeholder; `Signer` lets callers swap it

mod signer;

pub use signer::{canonical_query, signature, Sha256Signer, Signer};
