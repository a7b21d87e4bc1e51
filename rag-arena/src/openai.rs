//! OpenAI embedding and chat-completion providers.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationProvider, PromptTemplate};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "openai";

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use rag_arena::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new(api_key)?;
/// let embedding = provider.embed("Revenue grew 14.5%").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider using `text-embedding-3-small` (1536 dimensions).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    ///
    /// Unless [`with_dimensions`](Self::with_dimensions) was called, the
    /// declared dimensionality follows the model, and is 0 (unchecked) for
    /// models this crate does not know.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if self.request_dimensions.is_none() {
            self.dimensions = native_dimensions(&self.model);
        }
        self
    }

    /// Request truncated embeddings of `dims` dimensions.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 0,
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
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
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };
        let response = send(&self.client, OPENAI_EMBEDDINGS_URL, &self.api_key, &body)
            .await
            .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })?;
        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`GenerationProvider`] backed by OpenAI chat completions.
///
/// Defaults to `gpt-4o-mini` at temperature 0.0 with the
/// [`PromptTemplate::Naive`] instructions.
pub struct OpenAIGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    template: PromptTemplate,
}

impl OpenAIGenerationProvider {
    /// Create a provider with the default model and template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.0,
            template: PromptTemplate::default(),
        })
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Select the prompt instructions.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationProvider for OpenAIGenerationProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, context: &str, query: &str) -> Result<String> {
        let prompt = self.template.render(context, query);
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: PromptTemplate::SYSTEM },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: self.temperature,
        };
        let response = send(&self.client, OPENAI_CHAT_URL, &self.api_key, &body)
            .await
            .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })?;
        let parsed: ChatResponse = response.json().await.map_err(|e| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: format!("failed to parse response: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::GenerationError {
                provider: PROVIDER.into(),
                message: "response contained no message content".into(),
            })
    }
}

fn require_key(api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(RagError::InvalidConfiguration("OpenAI API key must not be empty".into()));
    }
    Ok(api_key)
}

/// POST `body` and return the response, or a message describing the failure.
async fn send<B: Serialize>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> std::result::Result<reqwest::Response, String> {
    let response = client.post(url).bearer_auth(api_key).json(body).send().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "request failed");
        format!("request failed: {e}")
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
        error!(provider = PROVIDER, %status, "API error");
        return Err(format!("API returned {status}: {detail}"));
    }
    Ok(response)
}
