//! Conversation gateway for storefront-chat
//!
//! This crate turns one user message into one assistant reply: it loads the
//! session log, builds the completion payload, calls the provider and
//! persists the capped result.

pub mod context;
pub mod error;
pub mod gateway;

pub use context::ContextBuilder;
pub use error::{ChatError, ChatResult};
pub use gateway::{ChatReply, ConversationGateway, GatewaySettings};
