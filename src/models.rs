use serde::{Deserialize, Serialize};

/// Longest section title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub challenge_id: String,
    pub test_case_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobToBeDone {
    pub task: String,
}

/// Per-collection input specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_info: Option<ChallengeInfo>,
    pub documents: Vec<Document>,
    pub persona: Persona,
    pub job_to_be_done: JobToBeDone,
}

impl InputJson {
    /// Query string embedded as the ranking target.
    pub fn query(&self) -> String {
        format!(
            "Persona: {}. Job: {}",
            self.persona.role, self.job_to_be_done.task
        )
    }

    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }
}

/// One page of extracted text, as produced by a [`crate::extraction::TextExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// A page-level span of document text with its derived title.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub text: String,
}

impl Section {
    /// Build a section from a page, deriving the title from its first non-blank line.
    ///
    /// Returns `None` when the page text is blank.
    pub fn from_page(document: &str, page: PageText) -> Option<Self> {
        if page.text.trim().is_empty() {
            return None;
        }
        let section_title = derive_title(&page.text, page.page_number);
        Some(Self {
            document: document.to_string(),
            page_number: page.page_number,
            section_title,
            text: page.text,
        })
    }
}

fn derive_title(text: &str, page_number: u32) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_TITLE_CHARS).collect())
        .unwrap_or_else(|| format!("Page {page_number}"))
}

/// A section selected by the ranker, with its score and 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub text: String,
    pub score: f32,
    pub importance_rank: u32,
}

/// Distilled summary of one ranked section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsectionSummary {
    pub document: String,
    pub page_number: u32,
    pub refined_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub importance_rank: u32,
    pub page_number: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

/// Persisted result document for one collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct OutputJson {
    pub metadata: Metadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}
