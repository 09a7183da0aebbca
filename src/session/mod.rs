//! Session storage.
//!
//! # Responsibilities
//! - Hold the auth token and login timestamp read by the dispatcher
//! - Apply the seven-day session validity rule
//!
//! # Design Decisions
//! - The dispatcher only reads the token; acquiring one is the caller's job
//! - Stores are injected as `Arc<dyn SessionStore>`; memory and JSON-file
//!   implementations are provided

mod store;
mod validity;

pub use store::{FileSessionStore, MemorySessionStore, SessionError, SessionState, SessionStore};
pub use validity::{check_session, is_session_valid, now_ms, record_login, SESSION_TTL_MS};
