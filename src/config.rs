//! Runtime settings loaded from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::distill::{BoundsPolicy, DEFAULT_MAX_OUTPUT_LENGTH, DEFAULT_MIN_OUTPUT_LENGTH};
use crate::ranking::DEFAULT_TOP_N;

pub const DEFAULT_INPUT_SPEC_FILE: &str = "challenge1b_input.json";
pub const DEFAULT_OUTPUT_FILE: &str = "challenge1b_output.json";
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors encountered while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable contained a value that could not be parsed or is out of range.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    /// Offline stemmed-term hashing.
    Hashed,
    /// Local Ollama runtime.
    Ollama,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProviderKind {
    /// Offline lead-sentence extraction.
    Extractive,
    /// Local Ollama runtime.
    Ollama,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashed" => Ok(Self::Hashed),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SummarizationProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extractive" => Ok(Self::Extractive),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_model: String,
    /// Vector size for the hashed embedder.
    pub embedding_dimension: usize,
    pub summarization_provider: SummarizationProviderKind,
    pub summarization_model: String,
    /// Tokenizer (model or encoding name) used to budget Ollama summarization input.
    pub summarization_tokenizer: String,
    pub summary_input_cap: usize,
    pub summary_max_length: usize,
    pub summary_min_length: usize,
    pub bounds_policy: BoundsPolicy,
    pub top_n: usize,
    pub ollama_url: String,
    pub provider_timeout: Duration,
    pub collection_timeout: Option<Duration>,
    pub input_spec_file: String,
    pub output_file: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        tracing::debug!(
            embedding_provider = ?config.embedding_provider,
            summarization_provider = ?config.summarization_provider,
            top_n = config.top_n,
            input_cap = config.summary_input_cap,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            embedding_provider: parse_kind(&get, "EMBEDDING_PROVIDER", EmbeddingProviderKind::Hashed)?,
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| "all-minilm".into()),
            embedding_dimension: parse_number(&get, "EMBEDDING_DIMENSION", 384)?,
            summarization_provider: parse_kind(
                &get,
                "SUMMARIZATION_PROVIDER",
                SummarizationProviderKind::Extractive,
            )?,
            summarization_model: get("SUMMARIZATION_MODEL").unwrap_or_else(|| "llama3.2".into()),
            summarization_tokenizer: get("SUMMARIZATION_TOKENIZER")
                .unwrap_or_else(|| "cl100k_base".into()),
            summary_input_cap: parse_number(&get, "SUMMARY_INPUT_CAP", 512)?,
            summary_max_length: parse_number(&get, "SUMMARY_MAX_LENGTH", DEFAULT_MAX_OUTPUT_LENGTH)?,
            summary_min_length: parse_number(&get, "SUMMARY_MIN_LENGTH", DEFAULT_MIN_OUTPUT_LENGTH)?,
            bounds_policy: parse_kind(&get, "SUMMARY_BOUNDS_POLICY", BoundsPolicy::Clamp)?,
            top_n: parse_number(&get, "RANKING_TOP_N", DEFAULT_TOP_N)?,
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            provider_timeout: Duration::from_secs(parse_number(&get, "PROVIDER_TIMEOUT_SECS", 120)?),
            collection_timeout: get("COLLECTION_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse()
                        .map(Duration::from_secs)
                        .map_err(|_| ConfigError::InvalidValue("COLLECTION_TIMEOUT_SECS".into()))
                })
                .transpose()?,
            input_spec_file: get("INPUT_SPEC_FILE")
                .unwrap_or_else(|| DEFAULT_INPUT_SPEC_FILE.into()),
            output_file: get("OUTPUT_FILE").unwrap_or_else(|| DEFAULT_OUTPUT_FILE.into()),
        };

        for (key, value) in [
            ("RANKING_TOP_N", config.top_n),
            ("SUMMARY_INPUT_CAP", config.summary_input_cap),
            ("SUMMARY_MAX_LENGTH", config.summary_max_length),
            ("EMBEDDING_DIMENSION", config.embedding_dimension),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(key.into()));
            }
        }

        Ok(config)
    }
}

fn parse_number<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .unwrap_or(Ok(default))
}

fn parse_kind<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr<Err = ()>,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|()| ConfigError::InvalidValue(key.to_string()))
        })
        .unwrap_or(Ok(default))
}
