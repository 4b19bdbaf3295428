//! Length-budgeted summaries of ranked sections.
//!
//! Each section is truncated to the provider's input cap (in the provider's own tokenizer
//! units, keeping the earliest text) before the provider is called. The requested output
//! ceiling then adapts to the truncated input: never more than half its words plus one.

use crate::error::{DigestError, Result};
use crate::models::{RankedSection, SubsectionSummary};
use crate::providers::{ProviderError, SummarizationProvider, SummaryBounds};

pub const DEFAULT_MAX_OUTPUT_LENGTH: usize = 300;
pub const DEFAULT_MIN_OUTPUT_LENGTH: usize = 30;

/// What to do when the adaptive ceiling falls below the minimum output length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Raise the ceiling to the minimum; the summary may run long relative to its input.
    #[default]
    Clamp,
    /// Fail the section with [`DigestError::SummaryBounds`].
    Reject,
}

impl std::str::FromStr for BoundsPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistillSettings {
    pub max_output_length: usize,
    pub min_output_length: usize,
    pub policy: BoundsPolicy,
}

impl Default for DistillSettings {
    fn default() -> Self {
        Self {
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
            min_output_length: DEFAULT_MIN_OUTPUT_LENGTH,
            policy: BoundsPolicy::Clamp,
        }
    }
}

/// Compute the bounds sent to the provider for an already truncated input.
pub fn effective_bounds(truncated: &str, settings: &DistillSettings) -> Result<SummaryBounds> {
    let adaptive = truncated.split_whitespace().count() / 2 + 1;
    let mut max_length = settings.max_output_length.min(adaptive);
    let min_length = settings.min_output_length;

    if max_length < min_length {
        match settings.policy {
            BoundsPolicy::Clamp => {
                tracing::warn!(
                    effective_max = max_length,
                    min = min_length,
                    "Summary ceiling below minimum; clamping up"
                );
                max_length = min_length;
            }
            BoundsPolicy::Reject => {
                return Err(DigestError::SummaryBounds {
                    effective_max: max_length,
                    min: min_length,
                });
            }
        }
    }

    Ok(SummaryBounds {
        max_length,
        min_length,
    })
}

/// Stateless per-section summarizer over an injected provider.
pub struct SummaryDistiller<'a> {
    provider: &'a dyn SummarizationProvider,
    settings: DistillSettings,
}

impl<'a> SummaryDistiller<'a> {
    pub fn new(provider: &'a dyn SummarizationProvider, settings: DistillSettings) -> Self {
        Self { provider, settings }
    }

    /// Provider input for `text`: the longest prefix within the provider's input cap.
    pub fn truncate_input(&self, text: &str) -> String {
        self.provider
            .tokenizer()
            .truncate(text, self.provider.input_cap())
    }

    pub async fn distill(&self, section: &RankedSection) -> Result<SubsectionSummary> {
        let truncated = self.truncate_input(&section.text);
        let bounds = effective_bounds(&truncated, &self.settings)?;

        tracing::debug!(
            document = %section.document,
            page = section.page_number,
            max_length = bounds.max_length,
            min_length = bounds.min_length,
            "Summarizing section"
        );

        let refined_text = self.provider.summarize(&truncated, bounds).await?;
        if refined_text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        Ok(SubsectionSummary {
            document: section.document.clone(),
            page_number: section.page_number,
            refined_text,
        })
    }

    /// Summarize each section in order, one provider call at a time.
    pub async fn distill_all(&self, sections: &[RankedSection]) -> Result<Vec<SubsectionSummary>> {
        let mut summaries = Vec::with_capacity(sections.len());
        for section in sections {
            summaries.push(self.distill(section).await?);
        }
        Ok(summaries)
    }
}
