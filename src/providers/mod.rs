//! Model provider seams.
//!
//! Embedding and summarization models are consumed through the traits in this module and
//! injected into the pipeline as `Arc<dyn ...>`. Two families ship with the crate: offline
//! deterministic providers (the defaults, no model server required) and Ollama-backed
//! providers that talk to a local runtime over HTTP.

mod embedding;
mod summarization;
mod tokenizer;

use crate::config::{Config, EmbeddingProviderKind, SummarizationProviderKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use embedding::{HashedTermEmbedder, OllamaEmbedder};
pub use summarization::{ExtractiveSummarizer, OllamaSummarizer};
pub use tokenizer::{BpeTokenizer, Tokenizer, WhitespaceTokenizer};

/// Errors raised by embedding and summarization providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider could not be reached or constructed.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    /// Provider returned an error response.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or did not match the request.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider returned no text.
    #[error("Provider returned an empty response")]
    EmptyResponse,
    /// Tokenizer resources were unavailable.
    #[error("Failed to load tokenizer '{name}': {source}")]
    Tokenizer {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Length controls passed to a summarization provider, in the provider's units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    pub max_length: usize,
    pub min_length: usize,
}

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Produce one vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    fn model_name(&self) -> &str;
}

/// Maps bounded input text to a shorter text.
#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    /// Summarize `text`, aiming for a length within `bounds` (best effort on the minimum).
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ProviderError>;

    /// Tokenizer the provider counts its input in.
    fn tokenizer(&self) -> &dyn Tokenizer;

    /// Largest input the provider accepts, in tokenizer units.
    fn input_cap(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Build the embedding provider selected by configuration.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding_provider {
        EmbeddingProviderKind::Hashed => {
            Arc::new(HashedTermEmbedder::new(config.embedding_dimension))
        }
        EmbeddingProviderKind::Ollama => Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            &config.embedding_model,
            config.provider_timeout,
        )?),
    };
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = embedder.model_name(),
        "Embedding provider ready"
    );
    Ok(embedder)
}

/// Build the summarization provider selected by configuration.
pub fn build_summarizer(
    config: &Config,
) -> Result<Arc<dyn SummarizationProvider>, ProviderError> {
    let summarizer: Arc<dyn SummarizationProvider> = match config.summarization_provider {
        SummarizationProviderKind::Extractive => {
            Arc::new(ExtractiveSummarizer::new(config.summary_input_cap))
        }
        SummarizationProviderKind::Ollama => Arc::new(OllamaSummarizer::new(
            &config.ollama_url,
            &config.summarization_model,
            BpeTokenizer::from_name(&config.summarization_tokenizer)?,
            config.summary_input_cap,
            config.provider_timeout,
        )?),
    };
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = summarizer.model_name(),
        input_cap = summarizer.input_cap(),
        "Summarization provider ready"
    );
    Ok(summarizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_offline_providers() {
        let config = Config::from_lookup(|_| None).unwrap();
        let embedder = build_embedder(&config).unwrap();
        let summarizer = build_summarizer(&config).unwrap();
        assert_eq!(embedder.model_name(), "hashed-terms");
        assert_eq!(summarizer.model_name(), "extractive-lead");
        assert_eq!(summarizer.input_cap(), 512);
    }

    #[test]
    fn ollama_config_builds_http_providers() {
        let config = Config::from_lookup(|key| match key {
            "EMBEDDING_PROVIDER" | "SUMMARIZATION_PROVIDER" => Some("ollama".into()),
            "EMBEDDING_MODEL" => Some("nomic-embed-text".into()),
            _ => None,
        })
        .unwrap();
        let embedder = build_embedder(&config).unwrap();
        let summarizer = build_summarizer(&config).unwrap();
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert_eq!(summarizer.model_name(), "llama3.2");
    }
}
