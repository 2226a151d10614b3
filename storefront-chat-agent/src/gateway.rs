//! Conversation gateway: one user message in, one assistant reply out

use std::sync::Arc;
use storefront_chat_core::config::Config;
use storefront_chat_core::session::{ChatMessage, ConversationLog, SessionStore};
use storefront_chat_providers::CompletionProvider;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::error::{ChatError, ChatResult};

/// Per-request completion parameters and the log cap
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Maximum stored messages per session
    pub max_messages: usize,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: Some(config.completion.model.clone()),
            max_tokens: config.completion.max_tokens,
            temperature: config.completion.temperature,
            max_messages: config.chat.max_messages,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a successful chat turn
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// The assistant's text
    pub response: String,
    /// The log as persisted after this turn
    pub conversation: ConversationLog,
}

/// Mediates between a session store and a completion provider.
///
/// Requests for the same session are not serialized: two concurrent turns
/// both read the same log and the later `put` wins.
pub struct ConversationGateway {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn CompletionProvider>,
    context: ContextBuilder,
    settings: GatewaySettings,
}

impl ConversationGateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn CompletionProvider>,
        context: ContextBuilder,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            store,
            provider,
            context,
            settings,
        }
    }

    /// Process one user message and return the assistant's reply.
    ///
    /// Blank or whitespace-only `session_id` and `user_text` are rejected.
    /// The user message, the reply and the cap are persisted together only
    /// after the completion succeeds; a failed completion leaves the stored
    /// log exactly as it was.
    pub async fn handle_message(&self, session_id: &str, user_text: &str) -> ChatResult<ChatReply> {
        if session_id.trim().is_empty() {
            return Err(ChatError::InvalidRequest(
                "sessionId is required".to_string(),
            ));
        }
        if user_text.trim().is_empty() {
            return Err(ChatError::InvalidRequest("message is required".to_string()));
        }

        info!(session_id, "Processing chat message");

        let mut log = self.store.get(session_id).await?.unwrap_or_default();
        log.push(ChatMessage::user(user_text));

        let payload = self.context.build_messages(&log);
        debug!(session_id, payload_len = payload.len(), "Calling completion provider");

        let response = self
            .provider
            .chat(
                payload,
                self.settings.model.clone(),
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await
            .and_then(|response| response.into_text())
            .map_err(|e| {
                warn!(session_id, error = %e, timeout = e.is_timeout(), "Completion failed");
                ChatError::CompletionFailure(e)
            })?;

        log.push(ChatMessage::assistant(response.clone()));
        let evicted = log.enforce_limit(self.settings.max_messages);
        if evicted > 0 {
            debug!(session_id, evicted, "Trimmed conversation to limit");
        }

        self.store.put(session_id, &log).await?;
        info!(session_id, messages = log.len(), "Chat turn stored");

        Ok(ChatReply {
            response,
            conversation: log,
        })
    }

    /// Stored log of a session; unknown sessions yield an empty log
    pub async fn conversation(&self, session_id: &str) -> ChatResult<ConversationLog> {
        Ok(self.store.get(session_id).await?.unwrap_or_default())
    }

    /// Remove a session's history. Clearing an unknown session succeeds.
    pub async fn clear(&self, session_id: &str) -> ChatResult<()> {
        self.store.delete(session_id).await?;
        info!(session_id, "Conversation cleared");
        Ok(())
    }

    /// Number of sessions known to the store
    pub async fn session_count(&self) -> ChatResult<usize> {
        Ok(self.store.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use storefront_chat_core::session::{MemorySessionStore, Role, StoreError, StoreResult};
    use storefront_chat_providers::{
        CompletionResponse, Message, OpenAIClient, ProviderError, ProviderResult,
    };

    /// Replies with a fixed text (or `reply-N`) and records every payload
    struct StubProvider {
        reply: Option<String>,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl StubProvider {
        fn fixed(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn numbered() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> ProviderResult<CompletionResponse> {
            let mut calls = self.calls.lock();
            calls.push(messages);
            let content = self
                .reply
                .clone()
                .unwrap_or_else(|| format!("reply-{}", calls.len()));
            Ok(CompletionResponse {
                content: Some(content),
                finish_reason: "stop".to_string(),
                usage: Default::default(),
            })
        }

        fn get_default_model(&self) -> String {
            "stub".to_string()
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> ProviderResult<CompletionResponse> {
            Err(ProviderError::RateLimited("HTTP 429: slow down".to_string()))
        }

        fn get_default_model(&self) -> String {
            "failing".to_string()
        }
    }

    /// Memory store that counts every call
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for CountingStore {
        async fn get(&self, session_id: &str) -> StoreResult<Option<ConversationLog>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get(session_id).await
        }

        async fn put(&self, session_id: &str, log: &ConversationLog) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.put(session_id, log).await
        }

        async fn delete(&self, session_id: &str) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(session_id).await
        }

        async fn count(&self) -> StoreResult<usize> {
            self.inner.count().await
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn get(&self, _session_id: &str) -> StoreResult<Option<ConversationLog>> {
            Err(StoreError::Database {
                status: 503,
                message: "connection refused".to_string(),
            })
        }

        async fn put(&self, _session_id: &str, _log: &ConversationLog) -> StoreResult<()> {
            unreachable!("put must not be reached when get fails")
        }

        async fn delete(&self, _session_id: &str) -> StoreResult<()> {
            Err(StoreError::NotConfigured("down".to_string()))
        }

        async fn count(&self) -> StoreResult<usize> {
            Err(StoreError::NotConfigured("down".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    fn gateway(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> ConversationGateway {
        ConversationGateway::new(
            store,
            provider,
            ContextBuilder::new("You are a helpful AI assistant."),
            GatewaySettings::default(),
        )
    }

    #[tokio::test]
    async fn test_first_message_creates_session() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(StubProvider::fixed("hello")));

        let reply = gateway.handle_message("s1", "hi").await.unwrap();

        assert_eq!(reply.response, "hello");
        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored, reply.conversation);
        let pairs: Vec<_> = stored
            .messages()
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(pairs, vec![(Role::User, "hi"), (Role::Assistant, "hello")]);
    }

    #[tokio::test]
    async fn test_payload_has_system_prompt_and_full_history() {
        let provider = Arc::new(StubProvider::fixed("ok"));
        let gateway = gateway(Arc::new(MemorySessionStore::new()), provider.clone());

        gateway.handle_message("s1", "first").await.unwrap();
        gateway.handle_message("s1", "second").await.unwrap();

        let calls = provider.calls.lock();
        let last = calls.last().unwrap();
        assert_eq!(
            last,
            &vec![
                Message::system("You are a helpful AI assistant."),
                Message::user("first"),
                Message::assistant("ok"),
                Message::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_touching_store() {
        let store = Arc::new(CountingStore::default());
        let provider = Arc::new(StubProvider::fixed("unused"));
        let gateway = gateway(store.clone(), provider.clone());

        let err = gateway.handle_message("s1", "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));

        let err = gateway.handle_message("", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_leaves_log_unchanged() {
        let store = Arc::new(MemorySessionStore::new());
        let seeded = gateway(store.clone(), Arc::new(StubProvider::fixed("hello")));
        seeded.handle_message("s1", "hi").await.unwrap();
        let before = store.get("s1").await.unwrap();

        let failing = gateway(store.clone(), Arc::new(FailingProvider));
        let err = failing.handle_message("s1", "are you there?").await.unwrap_err();

        assert!(matches!(
            err,
            ChatError::CompletionFailure(ProviderError::RateLimited(_))
        ));
        assert_eq!(store.get("s1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_completion_failure_on_new_session_stores_nothing() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(FailingProvider));

        assert!(gateway.handle_message("s1", "hi").await.is_err());
        assert!(store.get("s1").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_log_is_capped_to_most_recent_messages() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(StubProvider::numbered()));

        let mut appended = Vec::new();
        for i in 1..=25 {
            let text = format!("message {}", i);
            gateway.handle_message("s1", &text).await.unwrap();
            appended.push(text);
            appended.push(format!("reply-{}", i));
        }

        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.len(), 20);
        let contents: Vec<_> = stored.messages().iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, appended[appended.len() - 20..].to_vec());
        assert!(stored
            .messages()
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(StubProvider::fixed("hey")));

        gateway.handle_message("a", "from a").await.unwrap();
        gateway.handle_message("b", "from b").await.unwrap();

        let a = gateway.conversation("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.messages()[0].content, "from a");
        assert_eq!(gateway.session_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_backend_unavailable() {
        let gateway = gateway(Arc::new(BrokenStore), Arc::new(StubProvider::fixed("x")));

        let err = gateway.handle_message("s1", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::BackendUnavailable(_)));

        let err = gateway.clear("s1").await.unwrap_err();
        assert!(matches!(err, ChatError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_clear_then_conversation_is_empty() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(StubProvider::fixed("hello")));

        gateway.handle_message("s1", "hi").await.unwrap();
        gateway.clear("s1").await.unwrap();
        gateway.clear("s1").await.unwrap();

        assert!(gateway.conversation("s1").await.unwrap().is_empty());
    }

    /// Sleeps before echoing the last user message
    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> ProviderResult<CompletionResponse> {
            tokio::time::sleep(self.delay).await;
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(CompletionResponse {
                content: Some(format!("re: {}", last)),
                finish_reason: "stop".to_string(),
                usage: Default::default(),
            })
        }

        fn get_default_model(&self) -> String {
            "slow".to_string()
        }
    }

    #[tokio::test]
    async fn test_concurrent_turns_last_writer_wins() {
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(
            store.clone(),
            Arc::new(SlowProvider {
                delay: Duration::from_millis(50),
            }),
        );

        let (a, b) = tokio::join!(
            gateway.handle_message("s1", "A"),
            gateway.handle_message("s1", "B")
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.conversation.len(), 2);
        assert_eq!(b.conversation.len(), 2);

        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored == a.conversation || stored == b.conversation);
    }

    #[tokio::test]
    async fn test_completion_timeout_stores_nothing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = OpenAIClient::new(
            Some("sk-test".to_string()),
            Some(format!("http://{}/v1", addr)),
            "gpt-3.5-turbo".to_string(),
            Duration::from_millis(300),
        );
        let store = Arc::new(MemorySessionStore::new());
        let gateway = gateway(store.clone(), Arc::new(client));

        let err = gateway.handle_message("s1", "hi").await.unwrap_err();
        match err {
            ChatError::CompletionFailure(e) => assert!(e.is_timeout(), "not a timeout: {}", e),
            other => panic!("expected CompletionFailure, got {:?}", other),
        }
        assert!(store.get("s1").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);

        server.abort();
    }
}
