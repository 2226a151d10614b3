//! Supabase (PostgREST) session store
//!
//! Logs live in a table with a `conversation_id` text key and a `messages`
//! JSON column. Every call is a network round trip and may fail; failures
//! are reported as [`StoreError`], never swallowed.

use super::backend::{SessionStore, StoreError, StoreResult};
use super::store::ConversationLog;
use crate::config::StorageConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ConversationRow {
    #[serde(default)]
    messages: Option<ConversationLog>,
}

#[derive(Debug, Serialize)]
struct ConversationUpsert<'a> {
    conversation_id: &'a str,
    messages: &'a ConversationLog,
}

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Session store backed by a Supabase table
pub struct SupabaseSessionStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SupabaseSessionStore {
    /// Create a new store for `table` in the project at `url`
    pub fn new(
        url: &str,
        api_key: impl Into<String>,
        table: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.url.trim(),
            config.api_key.trim(),
            config.table.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn apply_headers(&self, req_builder: RequestBuilder) -> RequestBuilder {
        req_builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response) -> StoreResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => match body.code {
                Some(code) => format!("{} ({})", body.message, code),
                None => body.message,
            },
            Err(_) => text,
        };
        Err(StoreError::Database { status, message })
    }
}

/// Total from a `Content-Range` value such as `0-0/42` or `*/0`
fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl SessionStore for SupabaseSessionStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<ConversationLog>> {
        debug!(session_id, table = %self.table, "Fetching conversation");
        let request = self
            .client
            .get(self.table_url())
            .query(&[("select", "messages")])
            .query(&[("conversation_id", format!("eq.{}", session_id))])
            .query(&[("limit", "1")]);
        let response = Self::check(self.apply_headers(request).send().await?).await?;

        let rows: Vec<ConversationRow> = serde_json::from_str(&response.text().await?)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.messages.unwrap_or_default()))
    }

    async fn put(&self, session_id: &str, log: &ConversationLog) -> StoreResult<()> {
        debug!(session_id, messages = log.len(), "Upserting conversation");
        let body = ConversationUpsert {
            conversation_id: session_id,
            messages: log,
        };
        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "conversation_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body);
        Self::check(self.apply_headers(request).send().await?).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        debug!(session_id, "Deleting conversation");
        let request = self
            .client
            .delete(self.table_url())
            .query(&[("conversation_id", format!("eq.{}", session_id))])
            .header("Prefer", "return=minimal");
        Self::check(self.apply_headers(request).send().await?).await?;
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        let request = self
            .client
            .get(self.table_url())
            .query(&[("select", "conversation_id"), ("limit", "1")])
            .header("Prefer", "count=exact");
        let response = Self::check(self.apply_headers(request).send().await?).await?;
        let status = response.status().as_u16();

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StoreError::Database {
                status,
                message: "response is missing an exact Content-Range count".to_string(),
            })
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
