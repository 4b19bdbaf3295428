use async_trait::async_trait;
use persona_digest::extraction::{ExtractorRegistry, TextExtractor};
use persona_digest::models::{OutputJson, PageText};
use persona_digest::providers::{
    EmbeddingProvider, ExtractiveSummarizer, HashedTermEmbedder, ProviderError,
};
use persona_digest::{CollectionStatus, DigestError, Orchestrator, Pipeline};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const SPEC_FILE: &str = "challenge1b_input.json";
const OUTPUT_FILE: &str = "challenge1b_output.json";

fn offline_pipeline() -> Pipeline {
    Pipeline::new(
        Arc::new(HashedTermEmbedder::new(384)),
        Arc::new(ExtractiveSummarizer::new(512)),
    )
}

fn write_valid_collection(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(SPEC_FILE),
        r#"{
            "challenge_info": {"challenge_id": "round_1b_002", "test_case_name": "travel_planner"},
            "documents": [{"filename": "cities.txt", "title": "Cities"}, {"filename": "tips.txt"}],
            "persona": {"role": "Travel Planner"},
            "job_to_be_done": {"task": "Plan a trip of 4 days for a group of 10 college friends"}
        }"#,
    )
    .unwrap();
    fs::write(
        dir.join("cities.txt"),
        "Comprehensive Guide to Major Cities\nNice, Marseille and Lyon offer museums and markets.\u{000C}\
         Nightlife for Friends\nA group of college friends will enjoy bars and clubs on a trip.\u{000C}\
         Nightlife for Friends\nThe same heading repeated on a later page.",
    )
    .unwrap();
    fs::write(
        dir.join("tips.txt"),
        "Packing Tips\nBring layers, adapters and comfortable shoes for the trip.",
    )
    .unwrap();
}

fn read_output(path: &Path) -> OutputJson {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn malformed_collection_does_not_stop_valid_one() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    write_valid_collection(&input.path().join("Collection 1"));
    let broken = input.path().join("Collection 2");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join(SPEC_FILE), "{ \"documents\": ").unwrap();
    fs::write(broken.join("guide.txt"), "Some text").unwrap();

    let report = Orchestrator::new(offline_pipeline())
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.get("Collection 2").unwrap().status,
        CollectionStatus::Failed { .. }
    ));

    let written = read_output(&output.path().join("Collection 1").join(OUTPUT_FILE));
    assert_eq!(written.metadata.persona, "Travel Planner");
    assert_eq!(written.metadata.input_documents, vec!["cities.txt", "tips.txt"]);
    assert!(!output.path().join("Collection 2").join(OUTPUT_FILE).exists());
}

#[tokio::test]
async fn ranked_output_is_unique_and_contiguous() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_valid_collection(&input.path().join("travel"));

    Orchestrator::new(offline_pipeline())
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    let written = read_output(&output.path().join("travel").join(OUTPUT_FILE));
    let sections = &written.extracted_sections;
    assert_eq!(sections.len(), 3);

    let ranks: Vec<u32> = sections.iter().map(|s| s.importance_rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    let mut keys: Vec<(&str, &str)> = sections
        .iter()
        .map(|s| (s.document.as_str(), s.section_title.as_str()))
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), sections.len());

    assert_eq!(written.subsection_analysis.len(), sections.len());
    for (section, summary) in sections.iter().zip(&written.subsection_analysis) {
        assert_eq!(section.document, summary.document);
        assert_eq!(section.page_number, summary.page_number);
        assert!(!summary.refined_text.trim().is_empty());
        assert!(summary.refined_text.split_whitespace().count() <= 300);
    }
}

#[tokio::test]
async fn root_collection_writes_directly_into_output_root() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_valid_collection(input.path());
    write_valid_collection(&input.path().join("nested"));

    let report = Orchestrator::new(offline_pipeline())
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert!(output.path().join(OUTPUT_FILE).is_file());
    assert!(!output.path().join("nested").exists());
}

#[tokio::test]
async fn collection_without_documents_is_skipped() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_valid_collection(&input.path().join("a_valid"));
    let empty = input.path().join("b_empty");
    fs::create_dir_all(&empty).unwrap();
    fs::write(empty.join(SPEC_FILE), "{}").unwrap();

    let report = Orchestrator::new(offline_pipeline())
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(
        report.get("b_empty").unwrap().status,
        CollectionStatus::Skipped {
            reason: "no documents found".into()
        }
    );
}

#[tokio::test]
async fn missing_listed_document_fails_only_that_collection() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let dir = input.path().join("partial");
    write_valid_collection(&dir);
    fs::remove_file(dir.join("tips.txt")).unwrap();
    write_valid_collection(&input.path().join("complete"));

    let report = Orchestrator::new(offline_pipeline())
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    match &report.get("partial").unwrap().status {
        CollectionStatus::Failed { error } => assert!(error.contains("tips.txt")),
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn missing_input_root_is_an_error() {
    let output = tempdir().unwrap();
    let error = Orchestrator::new(offline_pipeline())
        .run_batch(&output.path().join("input"), output.path())
        .await
        .unwrap_err();
    assert!(matches!(error, DigestError::Configuration(_)));
}

struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn collection_deadline_aborts_without_writing() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_valid_collection(&input.path().join("slow"));

    let pipeline = Pipeline::new(
        Arc::new(SlowEmbedder),
        Arc::new(ExtractiveSummarizer::new(512)),
    );
    let report = Orchestrator::new(pipeline)
        .with_collection_timeout(Some(Duration::from_millis(50)))
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    match &report.get("slow").unwrap().status {
        CollectionStatus::Failed { error } => assert!(error.contains("timed out")),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(!output.path().join("slow").join(OUTPUT_FILE).exists());
}

/// Blocks the calling thread the way a pathological PDF parse would.
struct StuckExtractor;

impl TextExtractor for StuckExtractor {
    fn extract(&self, _path: &Path) -> persona_digest::Result<Vec<PageText>> {
        std::thread::sleep(Duration::from_secs(1));
        Ok(vec![PageText {
            page_number: 1,
            text: "Late Arrival\nText that shows up after the deadline.".into(),
        }])
    }
}

#[tokio::test]
async fn collection_deadline_interrupts_blocking_extraction() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_valid_collection(&input.path().join("stuck"));

    let pipeline = offline_pipeline().with_extractors(ExtractorRegistry::new(
        Box::new(StuckExtractor),
        Box::new(StuckExtractor),
    ));
    let started = Instant::now();
    let report = Orchestrator::new(pipeline)
        .with_collection_timeout(Some(Duration::from_millis(50)))
        .run_batch(input.path(), output.path())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(900));
    match &report.get("stuck").unwrap().status {
        CollectionStatus::Failed { error } => assert!(error.contains("timed out")),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(!output.path().join("stuck").join(OUTPUT_FILE).exists());
}

#[tokio::test]
async fn single_collection_mode_propagates_errors() {
    let dir = tempdir().unwrap();
    let error = offline_pipeline()
        .run(
            &dir.path().join(SPEC_FILE),
            dir.path(),
            &dir.path().join(OUTPUT_FILE),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, DigestError::Configuration(_)));
    assert!(!dir.path().join(OUTPUT_FILE).exists());
}
