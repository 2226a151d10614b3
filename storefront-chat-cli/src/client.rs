use anyhow::Result;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Thin HTTP client for a running storefront-chat server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub conversation: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct ConversationBody {
    conversation: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        let url = format!("{}/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "message": message, "sessionId": session_id }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>> {
        let url = self.conversation_url(session_id)?;
        let response = self.client.get(url).send().await?;
        let body: ConversationBody = check(response).await?.json().await?;
        Ok(body.conversation)
    }

    pub async fn clear(&self, session_id: &str) -> Result<String> {
        let url = self.conversation_url(session_id)?;
        let response = self.client.delete(url).send().await?;
        let body: Value = check(response).await?.json().await?;
        Ok(body["message"]
            .as_str()
            .unwrap_or("Conversation cleared")
            .to_string())
    }

    /// `{base}/conversation/{session_id}` with the id as one encoded segment
    fn conversation_url(&self, session_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid API base URL: {}", self.base_url))?
            .pop_if_empty()
            .push("conversation")
            .push(session_id);
        Ok(url)
    }

    pub async fn health(&self) -> Result<Value> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-2xx response into an error carrying the server's `{error, message}`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            error,
            message: Some(message),
        }) => anyhow::bail!("Server returned {}: {} ({})", status, error, message),
        Ok(ErrorBody { error, .. }) => anyhow::bail!("Server returned {}: {}", status, error),
        Err(_) => anyhow::bail!("Server returned {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_chat_sends_session_and_parses_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::Json(serde_json::json!({
                "message": "hi",
                "sessionId": "s1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"response":"hello","conversation":[
                    {"role":"user","content":"hi","timestamp":"2024-01-01T00:00:00Z"},
                    {"role":"assistant","content":"hello","timestamp":"2024-01-01T00:00:01Z"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(Some(format!("{}/api/", server.url())));
        let reply = client.chat("s1", "hi").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply.response, "hello");
        assert_eq!(reply.conversation.len(), 2);
        assert_eq!(reply.conversation[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_history_and_clear() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/conversation/s1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"conversation":[{"role":"user","content":"hi"}]}"#)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/conversation/s1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Conversation cleared successfully"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(Some(format!("{}/api", server.url())));
        let history = client.history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hi");
        assert!(history[0].timestamp.is_none());

        let message = client.clear("s1").await.unwrap();
        assert_eq!(message, "Conversation cleared successfully");
    }

    #[tokio::test]
    async fn test_session_id_is_a_single_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/conversation/a%2Fb%3Fc%23d")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Conversation cleared successfully"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(Some(format!("{}/api", server.url())));
        client.clear("a/b?c#d").await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_conversation_url_encodes_reserved_characters() {
        let client = ApiClient::new(Some("http://localhost:3000/api/".to_string()));
        let url = client.conversation_url("s 1/x").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/conversation/s%201%2Fx"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Completion API error","message":"HTTP 429: slow down"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(Some(format!("{}/api", server.url())));
        let err = client.chat("s1", "hi").await.unwrap_err().to_string();
        assert!(err.contains("Completion API error"));
        assert!(err.contains("slow down"));
    }
}
