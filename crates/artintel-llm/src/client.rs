//! HTTP client for an Ollama-compatible model server.
//!
//! Two endpoints are used: `/api/embed` for comment embeddings and
//! `/api/chat` for non-streaming chat completions. Transport failures are
//! classified into timeouts and refused connections so the CLI can tell the
//! user what to fix.

use std::time::Duration;

use artintel_core::AppConfig;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::LlmError;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

// Current servers return `embeddings` (one per input); older ones a single
// `embedding`.
#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Client for the model server.
///
/// Use [`OllamaClient::new`] with the loaded application config, or
/// [`OllamaClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    embed_model: String,
    chat_model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Creates a client from `OLLAMA_URL`, `EMBED_MODEL`, `LLM_MODEL` and the
    /// configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`LlmError::InvalidBaseUrl`] if the URL does not parse.
    pub fn new(config: &AppConfig) -> Result<Self, LlmError> {
        Self::with_base_url(
            &config.ollama_url,
            &config.embed_model,
            &config.llm_model,
            config.llm_timeout_secs,
        )
    }

    /// Creates a client with an explicit base URL and model names.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`LlmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        embed_model: &str,
        chat_model: &str,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("artintel/0.1")
            .build()?;

        // A single trailing slash keeps `Url::join` appending to any path
        // prefix instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| LlmError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            embed_model: embed_model.to_string(),
            chat_model: chat_model.to_string(),
            timeout_secs,
        })
    }

    #[must_use]
    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Embeds one text with the configured embedding model.
    ///
    /// The vector is returned as produced by the server; callers fit it to
    /// the storage dimension with [`crate::fit_to_dim`].
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport failure, a non-2xx status, an
    /// unparseable body, or a response with no vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbedRequest {
            model: &self.embed_model,
            input: text,
        };
        let response: EmbedResponse = self.post_json("api/embed", &request).await?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .or_else(|| Some(response.embedding).filter(|v| !v.is_empty()))
            .ok_or_else(|| LlmError::EmptyResponse("api/embed".to_string()))?;

        tracing::debug!(model = %self.embed_model, dims = vector.len(), "embedded text");
        Ok(vector)
    }

    /// Sends a non-streaming chat request and returns the trimmed reply.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport failure, a non-2xx status, an
    /// unparseable body, or an empty reply.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: false,
            options: ChatOptions { temperature },
        };
        let response: ChatResponse = self.post_json("api/chat", &request).await?;

        let content = response.message.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse("api/chat".to_string()));
        }

        tracing::debug!(model = %self.chat_model, chars = content.len(), "chat reply received");
        Ok(content)
    }

    /// Posts `body` as JSON to `endpoint` (relative to the base URL) and
    /// parses the response body.
    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, LlmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| LlmError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.classify(&url, e))?;
        serde_json::from_str(&text).map_err(|e| LlmError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    fn classify(&self, url: &Url, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else if error.is_connect() {
            LlmError::Unreachable(self.base_url.to_string())
        } else {
            LlmError::Http(error)
        }
    }
}
