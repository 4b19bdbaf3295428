//! Projection of pipeline records into the persisted output schema.

use chrono::Utc;

use crate::models::{
    ExtractedSection, InputJson, Metadata, OutputJson, RankedSection, SubsectionAnalysis,
    SubsectionSummary,
};

pub fn processing_timestamp() -> String {
    Utc::now().to_rfc3339()
}

pub fn assemble(
    input: &InputJson,
    ranked: &[RankedSection],
    summaries: &[SubsectionSummary],
    processing_timestamp: String,
) -> OutputJson {
    OutputJson {
        metadata: Metadata {
            input_documents: input.filenames(),
            persona: input.persona.role.clone(),
            job_to_be_done: input.job_to_be_done.task.clone(),
            processing_timestamp,
        },
        extracted_sections: ranked
            .iter()
            .map(|section| ExtractedSection {
                document: section.document.clone(),
                section_title: section.section_title.clone(),
                importance_rank: section.importance_rank,
                page_number: section.page_number,
            })
            .collect(),
        subsection_analysis: summaries
            .iter()
            .map(|summary| SubsectionAnalysis {
                document: summary.document.clone(),
                refined_text: summary.refined_text.clone(),
                page_number: summary.page_number,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, JobToBeDone, Persona};

    #[test]
    fn output_matches_persisted_schema() {
        let input = InputJson {
            challenge_info: None,
            documents: vec![
                Document {
                    filename: "south.pdf".into(),
                    title: None,
                },
                Document {
                    filename: "north.pdf".into(),
                    title: Some("North".into()),
                },
            ],
            persona: Persona {
                role: "Travel Planner".into(),
            },
            job_to_be_done: JobToBeDone {
                task: "Plan a 4 day trip".into(),
            },
        };
        let ranked = vec![RankedSection {
            document: "south.pdf".into(),
            page_number: 2,
            section_title: "Beaches".into(),
            text: "Beaches\nSand".into(),
            score: 0.8,
            importance_rank: 1,
        }];
        let summaries = vec![SubsectionSummary {
            document: "south.pdf".into(),
            page_number: 2,
            refined_text: "Sand.".into(),
        }];

        let output = assemble(&input, &ranked, &summaries, "2025-01-01T00:00:00+00:00".into());
        let value = serde_json::to_value(&output).unwrap();

        assert_eq!(
            value["metadata"]["input_documents"],
            serde_json::json!(["south.pdf", "north.pdf"])
        );
        assert_eq!(value["metadata"]["persona"], "Travel Planner");
        assert_eq!(value["metadata"]["job_to_be_done"], "Plan a 4 day trip");
        assert_eq!(
            value["extracted_sections"][0],
            serde_json::json!({
                "document": "south.pdf",
                "section_title": "Beaches",
                "importance_rank": 1,
                "page_number": 2
            })
        );
        assert_eq!(
            value["subsection_analysis"][0],
            serde_json::json!({
                "document": "south.pdf",
                "refined_text": "Sand.",
                "page_number": 2
            })
        );
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let stamp = processing_timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
