//! Answer generation through a chat-completions service.
//!
//! [`ChatCompletionGenerator`] speaks the OpenAI-compatible
//! `/chat/completions` protocol, which Groq serves at
//! `https://api.groq.com/openai/v1`. Decoding is pinned to temperature 0.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::api::post_json;
use crate::config::{DEFAULT_API_BASE, DEFAULT_MODEL, RagConfig};
use crate::error::{RagError, Result};

/// Turns an assembled prompt into a free-text answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Send one prompt and return the complete answer text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identify the backing model, for logging.
    fn name(&self) -> &str;
}

/// An [`AnswerGenerator`] backed by an OpenAI-compatible chat API.
///
/// Failures (missing key, transport errors, non-success status such as 401
/// or 429, timeouts, empty completions) all surface as
/// [`RagError::ServiceUnavailable`]. Nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// use notes_rag::ChatCompletionGenerator;
///
/// let generator = ChatCompletionGenerator::new(std::env::var("GROQ_API_KEY")?)?;
/// let answer = generator.generate(&prompt).await?;
/// ```
pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl ChatCompletionGenerator {
    const PROVIDER: &'static str = "ChatCompletions";

    /// Create a generator for the default Groq endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Self::unavailable("API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        })
    }

    /// Create a generator using the endpoint, model and timeout from `config`.
    pub fn from_config(api_key: impl Into<String>, config: &RagConfig) -> Result<Self> {
        Ok(Self::new(api_key)?
            .with_api_base(&config.api_base)
            .with_model(&config.model)
            .with_timeout(config.request_timeout))
    }

    /// Set the base URL of the OpenAI-compatible API.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the chat model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the upper bound on a single call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn unavailable(message: String) -> RagError {
        RagError::ServiceUnavailable { provider: Self::PROVIDER.into(), message }
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let response = post_json(&self.client, &url, &self.api_key, &body).await.map_err(|message| {
            error!(model = %self.model, error = %message, "chat request failed");
            Self::unavailable(message)
        })?;

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse chat response");
            Self::unavailable(format!("failed to parse response: {e}"))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Self::unavailable("API returned no completion".into()))
    }
}

// ── Chat completions request/response types ───────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AnswerGenerator for ChatCompletionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "generating answer");

        let answer = match tokio::time::timeout(self.timeout, self.request(prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                error!(model = %self.model, timeout_ms = self.timeout.as_millis() as u64, "chat request timed out");
                return Err(Self::unavailable(format!(
                    "no response within {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        info!(model = %self.model, answer_len = answer.len(), "answer generated");
        Ok(answer)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
