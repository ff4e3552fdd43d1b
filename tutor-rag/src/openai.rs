//! OpenAI-compatible embedding and chat-completion providers.
//!
//! Works against any endpoint speaking the OpenAI wire format, including
//! DashScope's compatible mode. This module is only available when the
//! `openai` feature is enabled.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::model::{ChatMessage, ChatModel, ChatRequest, Role};

/// The default API base (DashScope OpenAI-compatible mode).
pub const DEFAULT_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "qwen-max";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-v2";

/// Dimensionality of `text-embedding-v2`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Connection settings shared by both providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Base URL without a trailing `/embeddings` or `/chat/completions`.
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Per-request timeout; a timeout counts as a provider failure.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Create settings with the default endpoint and models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Read `OPENAI_API_KEY` and, if set, `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RagError::Config("API key must not be empty".to_string()));
        }
        Ok(())
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings`
/// endpoint.
///
/// Uses `reqwest` to call the endpoint directly with one input per request.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_rag::openai::{OpenAIEmbeddingProvider, ProviderConfig};
///
/// let provider = OpenAIEmbeddingProvider::new(&ProviderConfig::from_env()?)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from the shared settings.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: config.http_client()?,
            api_key: config.api_key.clone(),
            url: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Declare the dimensionality of a non-default model.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    fn error(message: String) -> RagError {
        RagError::Embedding { provider: "OpenAI".into(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", model = %self.model, text_len = text.len(), "embedding text");

        let request_body = EmbeddingRequest { model: &self.model, input: vec![text] };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                Self::error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "OpenAI", %status, "API error");
            return Err(Self::error(format!("API returned {status}: {detail}")));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            Self::error(format!("failed to parse response: {e}"))
        })?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Self::error("API returned empty response".into()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`ChatModel`] backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    /// Create a chat model from the shared settings.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let openai_config =
            OpenAIConfig::new().with_api_key(&config.api_key).with_api_base(&config.api_base);
        let client = Client::with_config(openai_config).with_http_client(config.http_client()?);

        Ok(Self { client, model: config.chat_model.clone() })
    }

    fn error(message: String) -> RagError {
        RagError::Model { provider: "OpenAI".into(), message }
    }

    fn convert_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let content = message.content.as_str();
        let converted: std::result::Result<ChatCompletionRequestMessage, OpenAIError> =
            match message.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(content)
                    .build()
                    .map(Into::into),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()
                    .map(Into::into),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content)
                    .build()
                    .map(Into::into),
            };
        converted.map_err(|e| Self::error(format!("failed to build message: {e}")))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let messages = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model).messages(messages).temperature(request.temperature);
        if let Some(max_tokens) = request.max_output_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if request.json_response {
            request_builder.response_format(ResponseFormat::JsonObject);
        }

        let openai_request = request_builder
            .build()
            .map_err(|e| Self::error(format!("failed to build request: {e}")))?;

        debug!(model = %self.model, messages = request.messages.len(), "chat completion");
        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion failed");
            Self::error(format!("API error: {e}"))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Self::error("API returned no completion".into()))
    }
}
