use serde::Serialize;
use std::sync::Arc;
use storefront_chat_agent::{ContextBuilder, ConversationGateway, GatewaySettings};
use storefront_chat_core::config::Config;
use storefront_chat_core::session::store_from_config;
use storefront_chat_core::utils::is_configured;
use storefront_chat_providers::provider_from_config;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ConversationGateway>,
    pub status: Arc<ServiceStatus>,
}

impl AppState {
    pub fn new(gateway: ConversationGateway, status: ServiceStatus) -> Self {
        Self {
            gateway: Arc::new(gateway),
            status: Arc::new(status),
        }
    }

    /// Wire the store and provider selected by configuration into a gateway
    pub fn from_config(config: &Config) -> Self {
        let store = store_from_config(&config.storage);
        let provider = provider_from_config(&config.completion);
        let gateway = ConversationGateway::new(
            store,
            provider,
            ContextBuilder::new(config.chat.system_prompt.clone()),
            GatewaySettings::from_config(config),
        );
        Self::new(gateway, ServiceStatus::from_config(config))
    }
}

/// Static configuration facts reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub completion_configured: bool,
    pub storage_backend: String,
    pub storage_configured: bool,
    pub env_check: EnvCheck,
}

impl ServiceStatus {
    pub fn from_config(config: &Config) -> Self {
        Self {
            completion_configured: config.completion.is_configured(),
            storage_backend: config.storage.backend.as_str().to_string(),
            storage_configured: config.storage.is_configured(),
            env_check: EnvCheck {
                has_completion_key: is_configured(&config.completion.api_key),
                has_storage_url: is_configured(&config.storage.url),
                has_storage_key: is_configured(&config.storage.api_key),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvCheck {
    pub has_completion_key: bool,
    pub has_storage_url: bool,
    pub has_storage_key: bool,
}
