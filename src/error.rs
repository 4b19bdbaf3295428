//! Error types shared by the extraction, ranking, distillation and batch layers.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::providers::ProviderError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DigestError>;

/// Everything that can go wrong while digesting a collection.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Missing or malformed input specification, missing input root, bad settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A listed document could not be read or parsed.
    #[error("Failed to extract text from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// None of the collection's documents produced usable text.
    #[error("No text extracted from documents")]
    NoText,

    /// Ranker contract violation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Effective summary bound fell below the minimum under the reject policy.
    #[error("Summary bounds collapsed: effective max {effective_max} is below min {min}")]
    SummaryBounds { effective_max: usize, min: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Per-collection deadline elapsed before the pipeline completed.
    #[error("Pipeline timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DigestError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
