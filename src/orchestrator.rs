//! Batch processing over a directory of collections.
//!
//! A collection is a directory holding the input specification file and at least one
//! supported document. The input root is checked first and, when it qualifies, is the only
//! collection; otherwise its immediate child directories are examined in name order. Every
//! collection runs in isolation: a failure is logged and recorded in the [`BatchReport`],
//! and the batch moves on.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Instrument;
use walkdir::WalkDir;

use crate::config::{Config, DEFAULT_INPUT_SPEC_FILE, DEFAULT_OUTPUT_FILE};
use crate::error::{DigestError, Result};
use crate::extraction::is_supported_document;
use crate::pipeline::Pipeline;

/// A directory found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDir {
    pub name: String,
    pub path: PathBuf,
    /// The input root itself is the collection.
    pub is_root: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    /// Specification and documents present.
    Ready(CollectionDir),
    /// Specification present but no documents.
    NoDocuments(CollectionDir),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    Succeeded {
        output_path: PathBuf,
        ranked_sections: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOutcome {
    pub name: String,
    pub directory: PathBuf,
    pub status: CollectionStatus,
}

/// Per-collection results of a batch run, in discovery order.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<CollectionOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, CollectionStatus::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, CollectionStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, CollectionStatus::Failed { .. }))
    }

    pub fn get(&self, name: &str) -> Option<&CollectionOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name == name)
    }

    fn count(&self, predicate: impl Fn(&CollectionStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

fn has_documents(dir: &Path) -> bool {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file() && is_supported_document(entry.path()))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Find the collections under `input_root`.
pub fn discover_collections(input_root: &Path, spec_file: &str) -> Result<Vec<Discovered>> {
    if input_root.join(spec_file).is_file() && has_documents(input_root) {
        return Ok(vec![Discovered::Ready(CollectionDir {
            name: dir_name(input_root),
            path: input_root.to_path_buf(),
            is_root: true,
        })]);
    }

    let mut discovered = Vec::new();
    for entry in WalkDir::new(input_root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DigestError::Io(e.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if !path.join(spec_file).is_file() {
            tracing::debug!(path = %path.display(), "No input specification; ignoring directory");
            continue;
        }
        let collection = CollectionDir {
            name: dir_name(path),
            path: path.to_path_buf(),
            is_root: false,
        };
        discovered.push(if has_documents(path) {
            Discovered::Ready(collection)
        } else {
            Discovered::NoDocuments(collection)
        });
    }
    Ok(discovered)
}

pub struct Orchestrator {
    pipeline: Pipeline,
    spec_file: String,
    output_file: String,
    collection_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            spec_file: DEFAULT_INPUT_SPEC_FILE.to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            collection_timeout: None,
        }
    }

    pub fn from_config(pipeline: Pipeline, config: &Config) -> Self {
        Self {
            pipeline,
            spec_file: config.input_spec_file.clone(),
            output_file: config.output_file.clone(),
            collection_timeout: config.collection_timeout,
        }
    }

    pub fn with_collection_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.collection_timeout = timeout;
        self
    }

    /// Where a collection's output document goes.
    pub fn output_path(&self, collection: &CollectionDir, output_root: &Path) -> PathBuf {
        if collection.is_root {
            output_root.join(&self.output_file)
        } else {
            output_root.join(&collection.name).join(&self.output_file)
        }
    }

    /// Process every collection under `input_root`, writing results under `output_root`.
    ///
    /// Only a missing or non-directory input root is an error; per-collection failures are
    /// reported in the returned [`BatchReport`].
    pub async fn run_batch(&self, input_root: &Path, output_root: &Path) -> Result<BatchReport> {
        if !input_root.is_dir() {
            return Err(DigestError::Configuration(format!(
                "input folder '{}' does not exist or is not a directory",
                input_root.display()
            )));
        }
        std::fs::create_dir_all(output_root)?;

        let discovered = discover_collections(input_root, &self.spec_file)?;
        if discovered.is_empty() {
            tracing::warn!(
                input = %input_root.display(),
                spec_file = %self.spec_file,
                "No collections found"
            );
        }

        let mut report = BatchReport::default();
        for entry in discovered {
            let outcome = match entry {
                Discovered::NoDocuments(collection) => {
                    tracing::warn!(collection = %collection.name, "Skipping: no documents found");
                    CollectionOutcome {
                        name: collection.name,
                        directory: collection.path,
                        status: CollectionStatus::Skipped {
                            reason: "no documents found".into(),
                        },
                    }
                }
                Discovered::Ready(collection) => {
                    self.process_collection(collection, output_root).await
                }
            };
            report.outcomes.push(outcome);
        }

        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch complete"
        );
        Ok(report)
    }

    async fn process_collection(
        &self,
        collection: CollectionDir,
        output_root: &Path,
    ) -> CollectionOutcome {
        let spec_path = collection.path.join(&self.spec_file);
        let output_path = self.output_path(&collection, output_root);
        let span = tracing::info_span!("collection", name = %collection.name);

        let result = async {
            tracing::info!("Processing collection");
            let work = self.pipeline.run(&spec_path, &collection.path, &output_path);
            match self.collection_timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(DigestError::Timeout(limit)),
                },
                None => work.await,
            }
        }
        .instrument(span)
        .await;

        let status = match result {
            Ok(output) => CollectionStatus::Succeeded {
                output_path,
                ranked_sections: output.extracted_sections.len(),
            },
            Err(error) => {
                tracing::error!(
                    collection = %collection.name,
                    error = %error,
                    "Failed to process collection"
                );
                CollectionStatus::Failed {
                    error: error.to_string(),
                }
            }
        };

        CollectionOutcome {
            name: collection.name,
            directory: collection.path,
            status,
        }
    }
}
