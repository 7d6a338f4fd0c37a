//! Configuration for the notes assistant.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Environment variable holding the language-model API key.
pub const DEFAULT_CREDENTIAL_VAR: &str = "GROQ_API_KEY";

/// OpenAI-compatible endpoint of the default language-model service.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration parameters for the notes assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Path of the plain-text notes file.
    pub notes_path: PathBuf,
    /// Directory holding the persisted index; `None` disables persistence.
    pub index_dir: Option<PathBuf>,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Maximum number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Environment variable that must hold the language-model credential.
    pub credential_var: String,
    /// Base URL of the OpenAI-compatible chat completions API.
    pub api_base: String,
    /// Chat model identifier.
    pub model: String,
    /// Upper bound on a single answer-generation call.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            notes_path: PathBuf::from("dsa_notes.txt"),
            index_dir: Some(PathBuf::from("./notes_index")),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: DEFAULT_TOP_K,
            credential_var: DEFAULT_CREDENTIAL_VAR.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from the defaults plus `NOTES_RAG_*` overrides.
    ///
    /// Recognised variables: `NOTES_RAG_NOTES_PATH`, `NOTES_RAG_INDEX_DIR`
    /// (`none` disables persistence), `NOTES_RAG_CHUNK_SIZE`,
    /// `NOTES_RAG_CHUNK_OVERLAP`, `NOTES_RAG_API_BASE`, `NOTES_RAG_MODEL` and
    /// `NOTES_RAG_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a numeric override does not parse
    /// or the resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(path) = lookup("NOTES_RAG_NOTES_PATH") {
            builder = builder.notes_path(path);
        }
        if let Some(dir) = lookup("NOTES_RAG_INDEX_DIR") {
            builder = if dir.eq_ignore_ascii_case("none") {
                builder.no_index_dir()
            } else {
                builder.index_dir(dir)
            };
        }
        if let Some(size) = lookup("NOTES_RAG_CHUNK_SIZE") {
            builder = builder.chunk_size(parse_number("NOTES_RAG_CHUNK_SIZE", &size)?);
        }
        if let Some(overlap) = lookup("NOTES_RAG_CHUNK_OVERLAP") {
            builder = builder.chunk_overlap(parse_number("NOTES_RAG_CHUNK_OVERLAP", &overlap)?);
        }
        if let Some(base) = lookup("NOTES_RAG_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Some(model) = lookup("NOTES_RAG_MODEL") {
            builder = builder.model(model);
        }
        if let Some(secs) = lookup("NOTES_RAG_TIMEOUT_SECS") {
            let secs = parse_number("NOTES_RAG_TIMEOUT_SECS", &secs)?;
            builder = builder.request_timeout(Duration::from_secs(secs as u64));
        }

        builder.build()
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| RagError::ConfigError(format!("{key} must be a whole number, got '{value}': {e}")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the notes file path.
    pub fn notes_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notes_path = path.into();
        self
    }

    /// Set the directory used to persist the index.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = Some(dir.into());
        self
    }

    /// Disable index persistence; the index is rebuilt on every start.
    pub fn no_index_dir(mut self) -> Self {
        self.config.index_dir = None;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the environment variable that holds the credential.
    pub fn credential_var(mut self, var: impl Into<String>) -> Self {
        self.config.credential_var = var.into();
        self
    }

    /// Set the base URL of the chat completions API.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    /// Set the chat model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the timeout for a single answer-generation call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `model` or `credential_var` is empty
    /// - `request_timeout` is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(RagError::ConfigError("model must not be empty".to_string()));
        }
        if config.credential_var.trim().is_empty() {
            return Err(RagError::ConfigError("credential_var must not be empty".to_string()));
        }
        if config.request_timeout.is_zero() {
            return Err(RagError::ConfigError("request_timeout must be non-zero".to_string()));
        }
        Ok(config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_notes_assistant() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.credential_var, "GROQ_API_KEY");
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert!(RagConfig::builder().build().is_ok());
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let result = RagConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_top_k_and_zero_timeout() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().request_timeout(Duration::ZERO).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = RagConfig::from_lookup(lookup_from(&[
            ("NOTES_RAG_NOTES_PATH", "notes/algorithms.md"),
            ("NOTES_RAG_INDEX_DIR", "none"),
            ("NOTES_RAG_CHUNK_SIZE", "400"),
            ("NOTES_RAG_CHUNK_OVERLAP", "40"),
            ("NOTES_RAG_MODEL", "llama-3.1-8b-instant"),
            ("NOTES_RAG_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.notes_path, PathBuf::from("notes/algorithms.md"));
        assert_eq!(config.index_dir, None);
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 40);
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_numeric_override_is_a_config_error() {
        let result = RagConfig::from_lookup(lookup_from(&[("NOTES_RAG_CHUNK_SIZE", "big")]));
        assert!(matches!(result, Err(RagError::ConfigError(msg)) if msg.contains("NOTES_RAG_CHUNK_SIZE")));
    }

    #[test]
    fn serializes_timeout_as_seconds() {
        let json = serde_json::to_value(RagConfig::default()).unwrap();
        assert_eq!(json["request_timeout"], 60);
        let back: RagConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, RagConfig::default());
    }
}
