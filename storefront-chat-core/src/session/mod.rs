//! Session management for conversation history
//!
//! A session is an opaque id mapped to a capped [`ConversationLog`]. The
//! log lives in a [`SessionStore`]; which implementation runs is decided
//! once at startup by [`store_from_config`].

pub mod backend;
pub mod store;
pub mod supabase;

pub use backend::{
    MemorySessionStore, SessionStore, StoreError, StoreResult, UnconfiguredSessionStore,
};
pub use store::{ChatMessage, ConversationLog, Role, DEFAULT_MAX_MESSAGES};
pub use supabase::SupabaseSessionStore;

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the session store selected by configuration.
///
/// A Supabase backend without credentials yields an
/// [`UnconfiguredSessionStore`] instead of failing startup.
pub fn store_from_config(config: &StorageConfig) -> Arc<dyn SessionStore> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory session store");
            Arc::new(MemorySessionStore::new())
        }
        StorageBackend::Supabase if config.is_configured() => {
            info!(url = %config.url, table = %config.table, "Using Supabase session store");
            Arc::new(SupabaseSessionStore::from_config(config))
        }
        StorageBackend::Supabase => {
            warn!("Supabase credentials not configured; conversation endpoints will fail");
            Arc::new(UnconfiguredSessionStore::new(
                "supabase",
                "Please configure SUPABASE_URL and SUPABASE_ANON_KEY",
            ))
        }
    }
}
