use std::time::{SystemTime, UNIX_EPOCH};

use super::store::{SessionError, SessionStore};

/// Sessions expire seven days after login.
pub const SESSION_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A session is valid when a non-empty token exists and login happened less
/// than [`SESSION_TTL_MS`] ago.
pub fn is_session_valid(token: Option<&str>, login_timestamp: Option<i64>, now_ms: i64) -> bool {
    match (token, login_timestamp) {
        (Some(token), Some(login)) if !token.is_empty() => now_ms.saturating_sub(login) < SESSION_TTL_MS,
        _ => false,
    }
}

/// Check the stored session, clearing it when invalid.
pub fn check_session(store: &dyn SessionStore, now_ms: i64) -> Result<bool, SessionError> {
    let token = store.token();
    let valid = is_session_valid(token.as_deref(), store.login_timestamp(), now_ms);
    if !valid {
        tracing::debug!(had_token = token.is_some(), "Session invalid, clearing");
        store.clear()?;
    }
    Ok(valid)
}

/// Store a freshly issued token together with its login time.
pub fn record_login(store: &dyn SessionStore, token: &str, now_ms: i64) -> Result<(), SessionError> {
    store.set_token(token)?;
    store.set_login_timestamp(now_ms)?;
    tracing::info!("Session recorded");
    Ok(())
}
