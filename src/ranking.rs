//! Relevance ranking of candidate sections against a query vector.
//!
//! Cosine similarity is the only signal. Ordering is a stable descending sort, so exact ties
//! keep extraction order, and the first occurrence of each `(document, section_title)` pair
//! wins over later duplicates.

use std::collections::HashSet;

use crate::error::{DigestError, Result};
use crate::models::{RankedSection, Section};

pub const DEFAULT_TOP_N: usize = 5;

/// Cosine similarity, or `0.0` when either vector has zero magnitude or the result is not
/// finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Select up to `top_n` unique sections ordered by similarity to `query_vector`.
///
/// Fails with [`DigestError::InvalidInput`] when `sections` and `section_vectors` differ in
/// length, when `top_n` is zero, or when a section vector's dimension differs from the
/// query's. An empty input yields an empty ranking.
pub fn rank(
    sections: &[Section],
    section_vectors: &[Vec<f32>],
    query_vector: &[f32],
    top_n: usize,
) -> Result<Vec<RankedSection>> {
    if sections.len() != section_vectors.len() {
        return Err(DigestError::InvalidInput(format!(
            "{} sections but {} section vectors",
            sections.len(),
            section_vectors.len()
        )));
    }
    if top_n == 0 {
        return Err(DigestError::InvalidInput("top_n must be at least 1".into()));
    }
    if let Some((idx, vector)) = section_vectors
        .iter()
        .enumerate()
        .find(|(_, vector)| vector.len() != query_vector.len())
    {
        return Err(DigestError::InvalidInput(format!(
            "section vector {idx} has dimension {} but query has {}",
            vector.len(),
            query_vector.len()
        )));
    }

    let mut scored: Vec<(&Section, f32)> = sections
        .iter()
        .zip(section_vectors)
        .map(|(section, vector)| (section, cosine_similarity(vector, query_vector)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut seen = HashSet::new();
    let mut ranked = Vec::with_capacity(top_n.min(scored.len()));
    for (section, score) in scored {
        if !seen.insert((section.document.as_str(), section.section_title.as_str())) {
            continue;
        }
        ranked.push(RankedSection {
            document: section.document.clone(),
            page_number: section.page_number,
            section_title: section.section_title.clone(),
            text: section.text.clone(),
            score,
            importance_rank: (ranked.len() + 1) as u32,
        });
        if ranked.len() == top_n {
            break;
        }
    }

    Ok(ranked)
}
