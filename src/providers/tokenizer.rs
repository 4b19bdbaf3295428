//! Provider-aligned tokenizers used to budget summarization input.
//!
//! Truncation always keeps a prefix of the original text and never cuts inside a unit the
//! provider counts: whole words for [`WhitespaceTokenizer`], whole BPE tokens (and whole UTF-8
//! characters) for [`BpeTokenizer`].

use super::ProviderError;
use tiktoken_rs::{
    cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base, CoreBPE,
};

/// Counts and truncates text in a provider's input units.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Longest prefix of `text` holding at most `max_tokens` units.
    fn truncate(&self, text: &str, max_tokens: usize) -> String;
}

/// Treats each whitespace-separated word as one unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let mut words = 0usize;
        let mut in_word = false;
        for (idx, ch) in text.char_indices() {
            if ch.is_whitespace() {
                in_word = false;
            } else if !in_word {
                if words == max_tokens {
                    return text[..idx].trim_end().to_string();
                }
                in_word = true;
                words += 1;
            }
        }
        text.to_string()
    }
}

/// Byte-pair encoding tokenizer backed by `tiktoken-rs`.
pub struct BpeTokenizer {
    name: String,
    encoding: CoreBPE,
}

impl BpeTokenizer {
    /// Resolve a tokenizer by model name (`gpt-4o`) or encoding name (`cl100k_base`).
    pub fn from_name(name: &str) -> Result<Self, ProviderError> {
        let normalized = name.trim();
        let target = if normalized.is_empty() {
            "cl100k_base"
        } else {
            normalized
        };
        let encoding = match get_bpe_from_model(target) {
            Ok(encoding) => encoding,
            Err(model_err) => {
                tracing::debug!(
                    tokenizer = target,
                    error = %model_err,
                    "Tokenizer model lookup failed; trying encoding name"
                );
                encoding_from_name(target).ok_or_else(|| ProviderError::Tokenizer {
                    name: target.to_string(),
                    source: model_err,
                })??
            }
        };
        Ok(Self {
            name: target.to_string(),
            encoding,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, ProviderError>> {
    let encoding = match name {
        "cl100k_base" => cl100k_base(),
        "o200k_base" => o200k_base(),
        "p50k_base" => p50k_base(),
        "p50k_edit" => p50k_edit(),
        "r50k_base" | "gpt2" => r50k_base(),
        _ => return None,
    };
    Some(encoding.map_err(|source| ProviderError::Tokenizer {
        name: name.to_string(),
        source,
    }))
}

impl Tokenizer for BpeTokenizer {
    fn count(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.encoding.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        // A token boundary can fall inside a multi-byte character; back off until the
        // prefix decodes to valid UTF-8.
        let mut end = max_tokens;
        while end > 0 {
            if let Ok(prefix) = self.encoding.decode(tokens[..end].to_vec()) {
                return prefix;
            }
            end -= 1;
        }
        String::new()
    }
}
