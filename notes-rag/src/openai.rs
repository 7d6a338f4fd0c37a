//! Remote embeddings through an OpenAI-compatible `/embeddings` endpoint.
//!
//! Any server exposing the same request shape works; point
//! [`OpenAIEmbeddingProvider::with_base_url`] at it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::api::post_json;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Remote embedder. Every chunk and every question costs one HTTP round trip,
/// except that index builds send all chunks in a single batch.
///
/// Defaults: `text-embedding-3-small` (1536 dimensions) at
/// `https://api.openai.com/v1`, key from `OPENAI_API_KEY` via
/// [`from_env`](Self::from_env).
///
/// # Example
///
/// ```rust,ignore
/// use notes_rag::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?
///     .with_base_url("http://localhost:11434/v1");
/// let vector = provider.embed("What is a heap?").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Sent to the API only after [`with_dimensions`](Self::with_dimensions).
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    const PROVIDER: &'static str = "OpenAI";

    /// Create a provider with an explicit key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Self::unavailable("API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            requested_dimensions: None,
        })
    }

    /// Create a provider keyed from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// [`MissingCredential`](RagError::MissingCredential) when the variable is
    /// unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_key(std::env::var(OPENAI_KEY_VAR).ok())
    }

    fn from_key(api_key: Option<String>) -> Result<Self> {
        match api_key {
            Some(key) if !key.trim().is_empty() => Self::new(key),
            _ => Err(RagError::MissingCredential { variable: OPENAI_KEY_VAR.into() }),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the service to truncate vectors to `dims` components.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.requested_dimensions = Some(dims);
        self
    }

    fn unavailable(message: String) -> RagError {
        RagError::ModelUnavailable { provider: Self::PROVIDER.into(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Order items by their reported `index` and check one came back per input.
fn into_vectors(mut items: Vec<EmbeddingItem>, expected: usize) -> std::result::Result<Vec<Vec<f32>>, String> {
    if items.len() != expected {
        return Err(format!("API returned {} embeddings for {expected} inputs", items.len()));
    }
    items.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| Self::unavailable("API returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = Self::PROVIDER, model = %self.model, batch_size = texts.len(), "embedding batch");

        let request = EmbeddingsRequest { model: &self.model, input: texts, dimensions: self.requested_dimensions };
        let url = format!("{}/embeddings", self.base_url);

        let response = post_json(&self.client, &url, &self.api_key, &request).await.map_err(|message| {
            error!(provider = Self::PROVIDER, model = %self.model, error = %message, "embedding request failed");
            Self::unavailable(message)
        })?;

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            error!(provider = Self::PROVIDER, error = %e, "failed to parse embeddings response");
            Self::unavailable(format!("failed to parse response: {e}"))
        })?;

        into_vectors(parsed.data, texts.len()).map_err(Self::unavailable)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: Option<usize>, value: f32) -> EmbeddingItem {
        EmbeddingItem { index, embedding: vec![value] }
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(OpenAIEmbeddingProvider::new(" "), Err(RagError::ModelUnavailable { .. })));
    }

    #[test]
    fn unset_or_blank_env_key_is_a_missing_credential() {
        for key in [None, Some("  ".to_string())] {
            let err = OpenAIEmbeddingProvider::from_key(key).err().unwrap();
            assert!(matches!(&err, RagError::MissingCredential { variable } if variable == "OPENAI_API_KEY"));
            assert!(err.is_configuration());
        }
        assert!(OpenAIEmbeddingProvider::from_key(Some("sk-test".into())).is_ok());
    }

    #[test]
    fn dimensions_are_only_sent_when_overridden() {
        let input = ["a"];
        let body = EmbeddingsRequest { model: "m", input: &input, dimensions: None };
        assert!(serde_json::to_value(&body).unwrap().get("dimensions").is_none());

        let provider = OpenAIEmbeddingProvider::new("key").unwrap().with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn vectors_follow_reported_index() {
        let vectors = into_vectors(vec![item(Some(1), 1.0), item(Some(0), 0.0)], 2).unwrap();
        assert_eq!(vectors, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn short_response_is_an_error() {
        let err = into_vectors(vec![item(None, 1.0)], 2).unwrap_err();
        assert!(err.contains("1 embeddings for 2 inputs"));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let provider = OpenAIEmbeddingProvider::new("key").unwrap().with_base_url("http://localhost:11434/v1/");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }
}
