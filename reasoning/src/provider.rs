//! Reasoning providers.
//!
//! A provider turns an ordered list of chat messages into a text reply, and
//! optionally into a JSON value that conforms to an [`OutputSchema`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReasoningError, Result};
use crate::schema::{OutputSchema, parse_json_reply};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request for a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in conversation order.
    pub messages: Vec<ChatMessage>,

    /// Model to use (provider-specific). `None` means the provider default.
    pub model: Option<String>,

    /// Sampling temperature. `None` means the provider's default sampling.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request holding a single user message.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            model: None,
            temperature: None,
        }
    }

    /// Prepend a system message.
    pub fn with_system(mut self, instructions: impl Into<String>) -> Self {
        self.messages.insert(0, ChatMessage::system(instructions));
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the model if one is given.
    pub fn with_model_opt(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model {
            self.model = Some(model.to_string());
        }
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the temperature if one is given.
    pub fn with_temperature_opt(mut self, temperature: Option<f32>) -> Self {
        if temperature.is_some() {
            self.temperature = temperature;
        }
        self
    }
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Text of the first choice.
    pub content: String,

    /// Model that produced the reply.
    pub model: String,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for reasoning providers.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Generate a free-text completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion that conforms to `schema`.
    ///
    /// The default implementation embeds the schema in the instructions and
    /// parses the reply as JSON. Providers with native structured output
    /// should override it.
    async fn complete_structured(
        &self,
        mut request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        let schema_text = serde_json::to_string_pretty(&schema.schema)?;
        request.messages.push(ChatMessage::system(format!(
            "Reply with a single JSON object that conforms to this JSON schema and nothing else:\n{schema_text}"
        )));
        let response = self.complete(request).await?;
        parse_json_reply(&schema.name, &response.content)
    }

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// How the API key is presented to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>` (OpenAI).
    #[default]
    Bearer,
    /// `api-key: <key>` (Azure OpenAI).
    ApiKeyHeader,
}

/// OpenAI-compatible chat completion provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL, without the trailing `/chat/completions`.
    base_url: String,

    /// Header used to send the key.
    auth_style: AuthStyle,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            auth_style: AuthStyle::Bearer,
            client: reqwest::Client::new(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set how the key is sent.
    pub fn with_auth_style(mut self, style: AuthStyle) -> Self {
        self.auth_style = style;
        self
    }

    /// Bound every request to `timeout`. Exceeding it yields
    /// [`ReasoningError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReasoningError::Http)?;
        Ok(self)
    }

    async fn post_chat(&self, body: serde_json::Value) -> Result<OpenAIChatResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ReasoningError::ProviderNotConfigured)?;

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json");
        let builder = match self.auth_style {
            AuthStyle::Bearer => builder.header("Authorization", format!("Bearer {api_key}")),
            AuthStyle::ApiKeyHeader => builder.header("api-key", api_key.as_str()),
        };

        let response = builder.json(&body).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(ReasoningError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        Ok(response.json().await?)
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": request.messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.request_body(&request);
        debug!("Requesting completion with model: {}", body["model"]);

        let result = self.post_chat(body).await?;
        let response = result.into_completion()?;

        info!(
            "Received completion of {} chars from {}",
            response.content.len(),
            response.model
        );
        Ok(response)
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        let mut body = self.request_body(&request);
        body["response_format"] = serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema.name,
                "schema": schema.schema,
            }
        });
        debug!(
            "Requesting structured completion `{}` with model: {}",
            schema.name, body["model"]
        );

        let result = self.post_chat(body).await?;
        let response = result.into_completion()?;
        parse_json_reply(&schema.name, &response.content)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI chat completion response format.
#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    model: String,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}

impl OpenAIChatResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        let tokens_used = self.usage.map(|u| u.total_tokens);
        let message = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ReasoningError::InvalidResponse("No choices in response".to_string()))?
            .message;

        if let Some(refusal) = message.refusal {
            return Err(ReasoningError::InvalidResponse(format!(
                "model refused: {refusal}"
            )));
        }
        let content = message
            .content
            .ok_or_else(|| ReasoningError::InvalidResponse("Empty message content".to_string()))?;

        Ok(CompletionResponse {
            content,
            model: self.model,
            tokens_used,
        })
    }
}
