use anyhow::{Context, Result};
use clap::Parser;
use persona_digest::orchestrator::{BatchReport, CollectionStatus};
use persona_digest::{logging, Config, Orchestrator, Pipeline};
use std::path::{Path, PathBuf};

/// Rank and summarize the document sections most relevant to a persona and task.
///
/// With no arguments, every collection under ./input is processed into ./output.
#[derive(Debug, Parser)]
#[command(name = "persona-digest", version)]
struct Cli {
    /// Input specification JSON for a single collection
    #[arg(requires_all = ["document_dir", "output_path"])]
    input_spec: Option<PathBuf>,

    /// Directory holding the collection's documents
    #[arg(requires_all = ["input_spec", "output_path"])]
    document_dir: Option<PathBuf>,

    /// Where to write the output JSON
    #[arg(requires_all = ["input_spec", "document_dir"])]
    output_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config).context("Failed to initialize providers")?;

    match (cli.input_spec, cli.document_dir, cli.output_path) {
        (Some(input_spec), Some(document_dir), Some(output_path)) => {
            pipeline
                .run(&input_spec, &document_dir, &output_path)
                .await
                .with_context(|| format!("Failed to process {}", input_spec.display()))?;
        }
        _ => {
            let report = run_batch_mode(pipeline, &config, &std::env::current_dir()?).await?;
            print_report(&report);
        }
    }

    Ok(())
}

/// Process `<working_dir>/input` into `<working_dir>/output`.
///
/// Only a missing input folder is an error; failed collections are part of the report and
/// leave the exit status at zero.
async fn run_batch_mode(
    pipeline: Pipeline,
    config: &Config,
    working_dir: &Path,
) -> Result<BatchReport> {
    let input_root = working_dir.join("input");
    let output_root = working_dir.join("output");
    let report = Orchestrator::from_config(pipeline, config)
        .run_batch(&input_root, &output_root)
        .await?;
    Ok(report)
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            CollectionStatus::Succeeded { output_path, .. } => {
                println!("✓ {}: saved {}", outcome.name, output_path.display())
            }
            CollectionStatus::Skipped { reason } => {
                println!("- {}: skipped: {reason}", outcome.name)
            }
            CollectionStatus::Failed { error } => {
                println!("✗ {}: failed: {error}", outcome.name)
            }
        }
    }
}
