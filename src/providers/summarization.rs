use super::{
    BpeTokenizer, ProviderError, SummarizationProvider, SummaryBounds, Tokenizer,
    WhitespaceTokenizer,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Offline summarizer that keeps the leading sentences that fit the word budget.
pub struct ExtractiveSummarizer {
    tokenizer: WhitespaceTokenizer,
    input_cap: usize,
}

impl ExtractiveSummarizer {
    pub fn new(input_cap: usize) -> Self {
        Self {
            tokenizer: WhitespaceTokenizer,
            input_cap,
        }
    }
}

fn split_sentences(text: &str) -> Vec<Vec<&str>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for word in text.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn lead_summary(text: &str, bounds: SummaryBounds) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut used = 0usize;

    for sentence in split_sentences(text) {
        if used + sentence.len() > bounds.max_length {
            break;
        }
        used += sentence.len();
    }

    // A first sentence longer than the budget is cut at the word limit; a short lead is
    // padded with following words toward the minimum.
    if used == 0 {
        used = bounds.max_length;
    } else if used < bounds.min_length {
        used = bounds.min_length.min(bounds.max_length);
    }

    words[..used.min(words.len())].join(" ")
}

#[async_trait]
impl SummarizationProvider for ExtractiveSummarizer {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ProviderError> {
        let summary = lead_summary(text, bounds);
        if summary.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(summary)
    }

    fn tokenizer(&self) -> &dyn Tokenizer {
        &self.tokenizer
    }

    fn input_cap(&self) -> usize {
        self.input_cap
    }

    fn model_name(&self) -> &str {
        "extractive-lead"
    }
}

/// Abstractive summarizer backed by a local Ollama runtime (`/api/generate`).
pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
    tokenizer: BpeTokenizer,
    input_cap: usize,
}

impl OllamaSummarizer {
    pub fn new(
        base_url: &str,
        model: &str,
        tokenizer: BpeTokenizer,
        input_cap: usize,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent("persona-digest/summary")
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderError::Unavailable(format!("http client: {error}")))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            model: model.to_string(),
            tokenizer,
            input_cap,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

fn build_prompt(text: &str, bounds: SummaryBounds) -> String {
    format!(
        "Summarize the following text in at least {} and at most {} words. \
         Return only the summary as a single paragraph.\n\n{}",
        bounds.min_length, bounds.max_length, text
    )
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationProvider for OllamaSummarizer {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, ProviderError> {
        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(text, bounds),
            "stream": false,
            "options": {
                "temperature": 0.1,
                "num_predict": bounds.max_length * 2,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ProviderError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::Unavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaGenerateResponse = response.json().await.map_err(|error| {
            ProviderError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(ProviderError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let summary = body.response.trim();
        if summary.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(summary.to_string())
    }

    fn tokenizer(&self) -> &dyn Tokenizer {
        &self.tokenizer
    }

    fn input_cap(&self) -> usize {
        self.input_cap
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn bounds(max_length: usize, min_length: usize) -> SummaryBounds {
        SummaryBounds {
            max_length,
            min_length,
        }
    }

    fn ollama(base_url: &str) -> OllamaSummarizer {
        OllamaSummarizer::new(
            base_url,
            "llama3.2",
            BpeTokenizer::from_name("cl100k_base").unwrap(),
            512,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn extractive_keeps_whole_leading_sentences() {
        let summarizer = ExtractiveSummarizer::new(512);
        let text = "Nice has beaches. The old town is lively at night. Trains run hourly.";
        let summary = summarizer.summarize(text, bounds(10, 1)).await.unwrap();
        assert_eq!(summary, "Nice has beaches. The old town is lively at night.");
    }

    #[tokio::test]
    async fn extractive_cuts_overlong_first_sentence() {
        let summarizer = ExtractiveSummarizer::new(512);
        let text = "one two three four five six seven eight";
        let summary = summarizer.summarize(text, bounds(3, 1)).await.unwrap();
        assert_eq!(summary, "one two three");
    }

    #[tokio::test]
    async fn extractive_pads_toward_minimum() {
        let summarizer = ExtractiveSummarizer::new(512);
        let text = "Short. Then a much longer sentence follows here.";
        let summary = summarizer.summarize(text, bounds(5, 4)).await.unwrap();
        assert_eq!(summary, "Short. Then a much");
    }

    #[tokio::test]
    async fn extractive_never_exceeds_maximum() {
        let summarizer = ExtractiveSummarizer::new(512);
        let text = "word ".repeat(400);
        let summary = summarizer.summarize(&text, bounds(300, 30)).await.unwrap();
        assert_eq!(summary.split_whitespace().count(), 300);
    }

    #[tokio::test]
    async fn extractive_rejects_blank_input() {
        let summarizer = ExtractiveSummarizer::new(512);
        let error = summarizer.summarize("   ", bounds(10, 1)).await.unwrap_err();
        assert!(matches!(error, ProviderError::EmptyResponse));
    }

    #[test]
    fn prompt_carries_bounds_and_text() {
        let prompt = build_prompt("Body text", bounds(40, 12));
        assert!(prompt.contains("at least 12 and at most 40 words"));
        assert!(prompt.ends_with("Body text"));
    }

    #[tokio::test]
    async fn ollama_summarizer_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{"model": "llama3.2", "stream": false}"#);
                then.status(200).json_body(json!({
                    "response": "  Summary text \n",
                    "done": true
                }));
            })
            .await;

        let summary = ollama(&server.base_url())
            .summarize("Some section text", bounds(20, 5))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_summarizer_handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = ollama(&server.base_url())
            .summarize("Some section text", bounds(20, 5))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn ollama_summarizer_rejects_empty_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "   ", "done": true }));
            })
            .await;

        let error = ollama(&server.base_url())
            .summarize("Some section text", bounds(20, 5))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::EmptyResponse));
    }
}
