//! Error types for the conversation gateway

use storefront_chat_core::session::StoreError;
use storefront_chat_providers::ProviderError;
use thiserror::Error;

/// Failure of a gateway operation
#[derive(Error, Debug)]
pub enum ChatError {
    /// A required field is missing or empty; nothing was touched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The session store is unconfigured or unreachable
    #[error("Storage unavailable: {0}")]
    BackendUnavailable(#[from] StoreError),

    /// The completion API failed (auth, rate limit, timeout, bad response)
    #[error("Completion failed: {0}")]
    CompletionFailure(#[from] ProviderError),
}

pub type ChatResult<T> = Result<T, ChatError>;
