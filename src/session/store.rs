use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by persistent session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key-value session storage.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn set_token(&self, token: &str) -> Result<(), SessionError>;

    /// Login time in milliseconds since the Unix epoch.
    fn login_timestamp(&self) -> Option<i64>;

    fn set_login_timestamp(&self, timestamp_ms: i64) -> Result<(), SessionError>;

    /// Remove both the token and the login timestamp.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub token: Option<String>,
    pub login_timestamp: Option<i64>,
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.snapshot().token
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.state.write().unwrap_or_else(PoisonError::into_inner).token = Some(token.to_string());
        Ok(())
    }

    fn login_timestamp(&self) -> Option<i64> {
        self.snapshot().login_timestamp
    }

    fn set_login_timestamp(&self, timestamp_ms: i64) -> Result<(), SessionError> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .login_timestamp = Some(timestamp_ms);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SessionState::default();
        Ok(())
    }
}

/// Session store persisted as a JSON file.
///
/// Reads are served from memory; every mutation rewrites the file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    state: RwLock<SessionState>,
}

impl FileSessionStore {
    /// Open the store, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let state: SessionState = serde_json::from_reader(reader)?;
            tracing::debug!(path = ?path, has_token = state.token.is_some(), "Loaded session file");
            state
        } else {
            SessionState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `apply` to a copy of the state, persist it, then commit it.
    /// A failed write leaves both the file and the in-memory state untouched.
    fn update(&self, apply: impl FnOnce(&mut SessionState)) -> Result<(), SessionError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        apply(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    /// Write to a sibling temp file and rename it over the target, so the
    /// session file is never observed half-written.
    fn persist(&self, state: &SessionState) -> Result<(), SessionError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp_path = parent.join(format!(".session.{}.tmp", Uuid::new_v4()));

        let written = write_json(&tmp_path, state).and_then(|()| {
            fs::rename(&tmp_path, &self.path).map_err(SessionError::from)
        });
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }
}

fn write_json(path: &Path, state: &SessionState) -> Result<(), SessionError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).token.clone()
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.update(|state| state.token = Some(token.to_string()))
    }

    fn login_timestamp(&self) -> Option<i64> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).login_timestamp
    }

    fn set_login_timestamp(&self, timestamp_ms: i64) -> Result<(), SessionError> {
        self.update(|state| state.login_timestamp = Some(timestamp_ms))
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.update(|state| *state = SessionState::default())
    }
}
