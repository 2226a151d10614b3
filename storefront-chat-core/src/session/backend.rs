//! Session store abstraction and the in-process implementation

use super::store::ConversationLog;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for session store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The selected backend is missing credentials
    #[error("{0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Database error (HTTP {status}): {message}")]
    Database { status: u16, message: String },

    #[error("Invalid stored data: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Mapping from session id to conversation log.
///
/// Unknown ids are never errors: `get` returns `None` and `delete` is a
/// no-op. Writes are whole-log replacements, so two concurrent writers for
/// the same session resolve as last-writer-wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current log of a session, `None` if the session is unknown
    async fn get(&self, session_id: &str) -> StoreResult<Option<ConversationLog>>;

    /// Replace the stored log of a session, creating it if needed
    async fn put(&self, session_id: &str, log: &ConversationLog) -> StoreResult<()>;

    /// Remove a session entirely
    async fn delete(&self, session_id: &str) -> StoreResult<()>;

    /// Number of known sessions
    async fn count(&self) -> StoreResult<usize>;

    /// Short backend name for health reporting
    fn backend_name(&self) -> &'static str;
}

/// Process-local session store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationLog>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<ConversationLog>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn put(&self, session_id: &str, log: &ConversationLog) -> StoreResult<()> {
        self.sessions
            .write()
            .insert(session_id.to_string(), log.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        self.sessions.write().remove(session_id);
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.sessions.read().len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Stand-in used when the configured backend lacks credentials.
///
/// Every operation fails with [`StoreError::NotConfigured`] so the server
/// keeps running and reports the problem per request.
#[derive(Debug, Clone)]
pub struct UnconfiguredSessionStore {
    backend: &'static str,
    reason: String,
}

impl UnconfiguredSessionStore {
    pub fn new(backend: &'static str, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::NotConfigured(self.reason.clone())
    }
}

#[async_trait]
impl SessionStore for UnconfiguredSessionStore {
    async fn get(&self, _session_id: &str) -> StoreResult<Option<ConversationLog>> {
        Err(self.error())
    }

    async fn put(&self, _session_id: &str, _log: &ConversationLog) -> StoreResult<()> {
        Err(self.error())
    }

    async fn delete(&self, _session_id: &str) -> StoreResult<()> {
        Err(self.error())
    }

    async fn count(&self) -> StoreResult<usize> {
        Err(self.error())
    }

    fn backend_name(&self) -> &'static str {
        self.backend
    }
}
