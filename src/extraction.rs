//! Page-level text extraction.
//!
//! PDF content streams are walked operator by operator with the `pdf` crate. When a document
//! yields no text that way, `pdftotext` (poppler-utils) is tried as a fallback. Plain `.txt`
//! files are split into pages on form feeds, the same page separator `pdftotext` emits.

use pdf::content::{Content, Op, TextDrawAdjusted};
use pdf::file::FileOptions;
use pdf::object::Resolve;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use crate::error::{DigestError, Result};
use crate::models::{PageText, Section};

const FORM_FEED: char = '\u{000C}';

/// Turns a document file into ordered pages of text.
pub trait TextExtractor: Send + Sync {
    /// Pages in order, numbered from 1. Pages without text may be empty strings.
    fn extract(&self, path: &Path) -> Result<Vec<PageText>>;
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Collapse whitespace runs within each line and drop blank lines.
fn clean_page_text(raw_text: &str) -> String {
    raw_text
        .lines()
        .map(|line| whitespace_run().replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split form-feed separated text into numbered pages.
fn split_pages(text: &str) -> Vec<PageText> {
    let mut pages: Vec<PageText> = text
        .split(FORM_FEED)
        .enumerate()
        .map(|(idx, page)| PageText {
            page_number: idx as u32 + 1,
            text: clean_page_text(page),
        })
        .collect();
    // Trailing form feed after the last page.
    if pages.len() > 1 && pages.last().is_some_and(|page| page.text.is_empty()) {
        pages.pop();
    }
    pages
}

pub struct PdfExtractor {
    use_pdftotext_fallback: bool,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            use_pdftotext_fallback: true,
        }
    }
}

impl PdfExtractor {
    pub fn without_fallback() -> Self {
        Self {
            use_pdftotext_fallback: false,
        }
    }

    fn extract_pdf_text(path: &Path) -> Result<Vec<PageText>> {
        let file = FileOptions::cached()
            .open(path)
            .map_err(|e| DigestError::extraction(path, e))?;
        let total_pages = file.num_pages();
        tracing::debug!(path = %path.display(), total_pages, "Opened PDF");

        let mut pages = Vec::with_capacity(total_pages as usize);
        for page_idx in 0..total_pages {
            let page_number = page_idx + 1;
            let mut page_text = String::new();
            match file.get_page(page_idx) {
                Ok(page) => {
                    if let Some(content) = &page.contents {
                        if let Err(e) = extract_text_from_content(&file, content, &mut page_text) {
                            tracing::warn!(page = page_number, error = %e, "Failed to read page content");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "Failed to load page");
                }
            }
            pages.push(PageText {
                page_number,
                text: clean_page_text(&page_text),
            });
        }
        Ok(pages)
    }

    fn extract_with_pdftotext(path: &Path) -> Result<Vec<PageText>> {
        tracing::info!(path = %path.display(), "Falling back to pdftotext");

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                DigestError::extraction(path, format!("failed to execute pdftotext: {e}"))
            })?;

        if !output.status.success() {
            return Err(DigestError::extraction(
                path,
                format!(
                    "pdftotext failed with status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| DigestError::extraction(path, "pdftotext output not valid UTF-8"))?;
        Ok(split_pages(&text))
    }
}

fn extract_text_from_content(
    resolver: &impl Resolve,
    content: &Content,
    text: &mut String,
) -> std::result::Result<(), pdf::error::PdfError> {
    for op in content.operations(resolver)? {
        match op {
            Op::TextDraw { text: t } => {
                let drawn = t.to_string_lossy();
                if !drawn.trim().is_empty() {
                    text.push_str(&drawn);
                    text.push(' ');
                }
            }
            Op::TextDrawAdjusted { array } => {
                for item in array {
                    match item {
                        TextDrawAdjusted::Text(drawn) => {
                            let drawn = drawn.to_string_lossy();
                            if !drawn.trim().is_empty() {
                                text.push_str(&drawn);
                            }
                        }
                        // Large negative kerning is how most producers encode a word gap.
                        TextDrawAdjusted::Spacing(gap) if gap < -200.0 => text.push(' '),
                        TextDrawAdjusted::Spacing(_) => {}
                    }
                }
                text.push(' ');
            }
            Op::TextNewline => text.push('\n'),
            Op::MoveTextPosition { translation } if translation.y.abs() > 1.0 => {
                text.push('\n');
            }
            Op::BeginText => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    Ok(())
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>> {
        let pages = match Self::extract_pdf_text(path) {
            Ok(pages) => pages,
            Err(error) if self.use_pdftotext_fallback => {
                tracing::warn!(path = %path.display(), error = %error, "PDF parsing failed");
                return Self::extract_with_pdftotext(path);
            }
            Err(error) => return Err(error),
        };

        if self.use_pdftotext_fallback && pages.iter().all(|page| page.text.trim().is_empty()) {
            tracing::info!(path = %path.display(), "No text in PDF content streams");
            // pdftotext may be absent; an empty result stays empty rather than failing.
            return Ok(Self::extract_with_pdftotext(path).unwrap_or(pages));
        }
        Ok(pages)
    }
}

/// Plain text documents, pages separated by form feeds.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>> {
        let text = std::fs::read_to_string(path).map_err(|e| DigestError::extraction(path, e))?;
        Ok(split_pages(&text))
    }
}

/// Dispatches to an extractor by file extension.
pub struct ExtractorRegistry {
    pdf: Box<dyn TextExtractor>,
    text: Box<dyn TextExtractor>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self {
            pdf: Box::new(PdfExtractor::default()),
            text: Box::new(PlainTextExtractor),
        }
    }
}

/// Whether `path` names a document type the registry can read.
pub fn is_supported_document(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("pdf" | "txt"))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

impl ExtractorRegistry {
    pub fn new(pdf: Box<dyn TextExtractor>, text: Box<dyn TextExtractor>) -> Self {
        Self { pdf, text }
    }

    pub fn extract(&self, path: &Path) -> Result<Vec<PageText>> {
        if !path.is_file() {
            return Err(DigestError::extraction(path, "document not found"));
        }
        match extension(path).as_deref() {
            Some("pdf") => self.pdf.extract(path),
            Some("txt") => self.text.extract(path),
            _ => Err(DigestError::extraction(path, "unsupported document type")),
        }
    }

    /// Extract every listed document under `document_dir` into non-blank sections.
    pub fn collect_sections(&self, document_dir: &Path, filenames: &[String]) -> Result<Vec<Section>> {
        let mut sections = Vec::new();
        for filename in filenames {
            let path = document_dir.join(filename);
            let pages = self.extract(&path)?;
            let before = sections.len();
            sections.extend(
                pages
                    .into_iter()
                    .filter_map(|page| Section::from_page(filename, page)),
            );
            tracing::debug!(
                document = %filename,
                sections = sections.len() - before,
                "Extracted sections"
            );
        }
        Ok(sections)
    }
}
