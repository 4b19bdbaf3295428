//! Single-collection pipeline: extract, embed, rank, distill, assemble, write.

use std::path::Path;
use std::sync::Arc;

use crate::assembler::{assemble, processing_timestamp};
use crate::config::Config;
use crate::distill::{DistillSettings, SummaryDistiller};
use crate::error::{DigestError, Result};
use crate::extraction::ExtractorRegistry;
use crate::models::{InputJson, OutputJson, Section};
use crate::providers::{self, EmbeddingProvider, ProviderError, SummarizationProvider};
use crate::ranking::{self, DEFAULT_TOP_N};
use crate::utils::write_atomically;

pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: Arc<dyn SummarizationProvider>,
    extractors: Arc<ExtractorRegistry>,
    top_n: usize,
    distill: DistillSettings,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn SummarizationProvider>,
    ) -> Self {
        Self {
            embedder,
            summarizer,
            extractors: Arc::new(ExtractorRegistry::default()),
            top_n: DEFAULT_TOP_N,
            distill: DistillSettings::default(),
        }
    }

    /// Build the providers and settings named by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = providers::build_embedder(config)?;
        let summarizer = providers::build_summarizer(config)?;
        Ok(Self::new(embedder, summarizer)
            .with_top_n(config.top_n)
            .with_distill_settings(DistillSettings {
                max_output_length: config.summary_max_length,
                min_output_length: config.summary_min_length,
                policy: config.bounds_policy,
            }))
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Arc::new(extractors);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_distill_settings(mut self, settings: DistillSettings) -> Self {
        self.distill = settings;
        self
    }

    /// Produce the output document for one collection without writing it.
    pub async fn process(&self, spec_path: &Path, document_dir: &Path) -> Result<OutputJson> {
        let input = read_input(spec_path)?;
        let filenames = input.filenames();

        let sections = self.collect_sections(document_dir, &filenames).await?;
        if sections.is_empty() {
            return Err(DigestError::NoText);
        }
        tracing::info!(
            documents = filenames.len(),
            sections = sections.len(),
            "Extracted candidate sections"
        );

        let mut texts = Vec::with_capacity(sections.len() + 1);
        texts.push(input.query());
        texts.extend(sections.iter().map(|section| section.text.clone()));

        let mut vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            ))
            .into());
        }
        let section_vectors = vectors.split_off(1);
        let query_vector = &vectors[0];

        let ranked = ranking::rank(&sections, &section_vectors, query_vector, self.top_n)?;
        tracing::info!(ranked = ranked.len(), "Ranked sections");

        let distiller = SummaryDistiller::new(self.summarizer.as_ref(), self.distill);
        let summaries = distiller.distill_all(&ranked).await?;

        Ok(assemble(&input, &ranked, &summaries, processing_timestamp()))
    }

    /// Document parsing and `pdftotext` block, so they run off the async workers. A deadline
    /// on the caller fires even while extraction is still running; its result is discarded.
    async fn collect_sections(
        &self,
        document_dir: &Path,
        filenames: &[String],
    ) -> Result<Vec<Section>> {
        let extractors = Arc::clone(&self.extractors);
        let dir = document_dir.to_path_buf();
        let filenames = filenames.to_vec();
        tokio::task::spawn_blocking(move || extractors.collect_sections(&dir, &filenames))
            .await
            .map_err(|e| DigestError::extraction(document_dir, format!("extraction task failed: {e}")))?
    }

    /// Process one collection and persist its output at `output_path`.
    ///
    /// Nothing is written unless every stage succeeds.
    pub async fn run(
        &self,
        spec_path: &Path,
        document_dir: &Path,
        output_path: &Path,
    ) -> Result<OutputJson> {
        let output = self.process(spec_path, document_dir).await?;
        let json = serde_json::to_string_pretty(&output)?;
        write_atomically(output_path, json.as_bytes())?;
        tracing::info!(output = %output_path.display(), "Saved output");
        Ok(output)
    }
}

/// Read and parse an input specification.
pub fn read_input(spec_path: &Path) -> Result<InputJson> {
    let raw = std::fs::read_to_string(spec_path).map_err(|e| {
        DigestError::Configuration(format!(
            "failed to read input specification {}: {e}",
            spec_path.display()
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        DigestError::Configuration(format!(
            "failed to parse input specification {}: {e}",
            spec_path.display()
        ))
    })
}
