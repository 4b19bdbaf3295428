//! Persona-driven section ranking and summary digests over document collections.
//!
//! A collection is an input specification (persona, task, document list) plus its documents.
//! For each collection the pipeline extracts page-level sections, ranks them against the
//! persona/task query by embedding similarity, distills the top sections with a summarization
//! provider, and writes one JSON digest.

pub mod assembler;
pub mod config;
pub mod distill;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod ranking;
pub mod utils;

pub use config::Config;
pub use error::{DigestError, Result};
pub use orchestrator::{BatchReport, CollectionStatus, Orchestrator};
pub use pipeline::Pipeline;
