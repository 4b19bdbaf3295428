use super::{EmbeddingProvider, ProviderError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_stemmers::{Algorithm, Stemmer};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic offline embedder: stemmed terms hashed into a fixed-size bag.
pub struct HashedTermEmbedder {
    dimension: usize,
    stemmer: Stemmer,
}

impl HashedTermEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let lowered = word.to_lowercase();
            let stem = self.stemmer.stem(&lowered);
            let slot = (fnv1a(stem.as_bytes()) % self.dimension as u64) as usize;
            embedding[slot] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashedTermEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.dimension == 0 {
            return Err(ProviderError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn model_name(&self) -> &str {
        "hashed-terms"
    }
}

/// Embedder backed by a local Ollama runtime (`/api/embed`).
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent("persona-digest/embed")
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderError::Unavailable(format!("http client: {error}")))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, inputs = texts.len(), "Requesting embeddings");

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                ProviderError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::Unavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbedResponse = response.json().await.map_err(|error| {
            ProviderError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if body.embeddings.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
