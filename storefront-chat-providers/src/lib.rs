//! Completion API integrations for storefront-chat
//!
//! This crate provides the provider abstraction and an OpenAI-compatible
//! chat completions client.

pub mod base;
pub mod openai;

pub use base::{CompletionProvider, CompletionResponse, Message, ProviderError, ProviderResult};
pub use openai::OpenAIClient;

use async_trait::async_trait;
use std::sync::Arc;
use storefront_chat_core::config::CompletionConfig;
use tracing::{info, warn};

/// Provider used when no API key is configured; every call fails with
/// [`ProviderError::ConfigError`].
pub struct UnconfiguredProvider {
    default_model: String,
}

impl UnconfiguredProvider {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    async fn chat(
        &self,
        _messages: Vec<Message>,
        _model: Option<String>,
        _max_tokens: u32,
        _temperature: f32,
    ) -> ProviderResult<CompletionResponse> {
        Err(ProviderError::ConfigError(
            "Please configure your OpenAI API key (OPENAI_API_KEY)".to_string(),
        ))
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

/// Build the completion provider described by configuration
pub fn provider_from_config(config: &CompletionConfig) -> Arc<dyn CompletionProvider> {
    if config.is_configured() {
        info!(api_base = %config.api_base, model = %config.model, "Using OpenAI-compatible provider");
        Arc::new(OpenAIClient::from_config(config))
    } else {
        warn!("OpenAI API key not configured; chat requests will fail");
        Arc::new(UnconfiguredProvider::new(config.model.clone()))
    }
}
