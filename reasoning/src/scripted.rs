//! A provider that replays canned replies.
//!
//! Useful for tests and for embedding the engine where replies come from
//! somewhere other than an HTTP service.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ReasoningError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, ReasoningProvider};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Reply with this text.
    Text(String),
    /// Fail with [`ReasoningError::ApiRequest`].
    Failure(String),
    /// Fail with [`ReasoningError::Timeout`].
    Timeout,
    /// Never complete. Lets callers exercise their own cancellation.
    Pending,
}

/// Replays [`ScriptedReply`] values in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue any outcome.
    pub fn with(self, reply: ScriptedReply) -> Self {
        self.push(reply);
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        debug!("Scripted provider replying with {next:?}");
        match next {
            Some(ScriptedReply::Text(content)) => Ok(CompletionResponse {
                content,
                model: "scripted".to_string(),
                tokens_used: None,
            }),
            Some(ScriptedReply::Failure(message)) => Err(ReasoningError::ApiRequest(message)),
            Some(ScriptedReply::Timeout) => Err(ReasoningError::Timeout),
            Some(ScriptedReply::Pending) => std::future::pending().await,
            None => Err(ReasoningError::InvalidResponse(
                "no scripted reply left".to_string(),
            )),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OutputSchema;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replays_in_order_and_records_requests() {
        let provider = ScriptedProvider::new()
            .with_reply("first")
            .with(ScriptedReply::Failure("boom".to_string()));

        let first = provider.complete(CompletionRequest::user("a")).await.unwrap();
        assert_eq!(first.content, "first");

        let err = provider
            .complete(CompletionRequest::user("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::ApiRequest(ref m) if m == "boom"));

        let err = provider
            .complete(CompletionRequest::user("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::InvalidResponse(_)));

        let prompts: Vec<String> = provider
            .requests()
            .into_iter()
            .map(|r| r.messages[0].content.clone())
            .collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_default_structured_parses_fenced_json() {
        let provider = ScriptedProvider::new().with_reply("```json\n{\"ok\": true}\n```");
        let schema = OutputSchema::new("flag", serde_json::json!({"type": "object"}));

        let value = provider
            .complete_structured(CompletionRequest::user("flag?"), &schema)
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"ok": true}));

        let request = &provider.requests()[0];
        assert!(request.messages.last().unwrap().content.contains("JSON schema"));
    }

    #[tokio::test]
    async fn test_default_structured_rejects_non_json() {
        let provider = ScriptedProvider::new().with_reply("not json");
        let schema = OutputSchema::new("flag", serde_json::json!({"type": "object"}));

        let err = provider
            .complete_structured(CompletionRequest::user("flag?"), &schema)
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn test_pending_reply_can_be_cancelled() {
        let provider = ScriptedProvider::new().with(ScriptedReply::Pending);
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            provider.complete(CompletionRequest::user("wait")),
        )
        .await;
        assert!(outcome.is_err());
    }
}
