use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{Summarizer, SummaryRequest};
use crate::models::SENTINEL;
use crate::sanitize::truncate;

/// Longest description text ever sent to the summarizer.
pub const SUMMARY_INPUT_LIMIT: usize = 6000;
pub const SUMMARY_MAX_TOKENS: u32 = 180;
pub const SUMMARY_TEMPERATURE: f32 = 0.2;

const INSTRUCTIONS: &str = "You summarize second-hand marketplace item descriptions. \
Write at most 3 sentences in an objective, neutral tone. \
State only facts about the item: what it is, its condition, and what is included. \
Do not use promotional language, superlatives, emojis, or calls to action. \
Ignore shipping, payment, and returns information.";

/// Only calls the summarizer for allowed items with real text.
pub struct SummarizationGate {
    summarizer: Arc<dyn Summarizer>,
}

impl SummarizationGate {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        SummarizationGate { summarizer }
    }

    /// Returns the summary, or the sentinel when not allowed, when there is no
    /// text, or when the summarizer fails.
    pub async fn summarize(&self, title: &str, clean_text: &str, allowed: bool) -> String {
        if !allowed || clean_text == SENTINEL || clean_text.trim().is_empty() {
            return SENTINEL.to_string();
        }

        let request = build_request(title, clean_text);
        match self.summarizer.summarize(&request).await {
            Ok(summary) => {
                debug!("Summarized '{}' into {} chars", title, summary.len());
                summary
            }
            Err(e) => {
                warn!("Summarization failed for '{}': {}", title, e);
                SENTINEL.to_string()
            }
        }
    }
}

pub fn build_request(title: &str, clean_text: &str) -> SummaryRequest {
    let text = truncate(clean_text, SUMMARY_INPUT_LIMIT);

    let mut input = String::with_capacity(title.len() + text.len() + 32);
    input.push_str("Item title: ");
    input.push_str(title);
    input.push_str("\n\nDescription:\n");
    input.push_str(&text);

    SummaryRequest {
        instructions: INSTRUCTIONS.to_string(),
        input,
        max_output_tokens: SUMMARY_MAX_TOKENS,
        temperature: SUMMARY_TEMPERATURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSummarizer {
        fail: bool,
        requests: Mutex<Vec<SummaryRequest>>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Err(AppError::LlmError("upstream 500".into()))
            } else {
                Ok("A working film camera.".into())
            }
        }
    }

    #[tokio::test]
    async fn not_allowed_never_contacts_the_service() {
        let fake = Arc::new(RecordingSummarizer::default());
        let gate = SummarizationGate::new(fake.clone());

        assert_eq!(gate.summarize("Canon AE-1", "Works great", false).await, SENTINEL);
        assert!(fake.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sentinel_text_is_not_summarized() {
        let fake = Arc::new(RecordingSummarizer::default());
        let gate = SummarizationGate::new(fake.clone());

        assert_eq!(gate.summarize("Canon AE-1", SENTINEL, true).await, SENTINEL);
        assert!(fake.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_failure_degrades_to_sentinel() {
        let fake = Arc::new(RecordingSummarizer {
            fail: true,
            ..Default::default()
        });
        let gate = SummarizationGate::new(fake.clone());

        assert_eq!(gate.summarize("Canon AE-1", "Works great", true).await, SENTINEL);
        assert_eq!(fake.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn allowed_item_is_summarized_with_bounded_input() {
        let fake = Arc::new(RecordingSummarizer::default());
        let gate = SummarizationGate::new(fake.clone());
        let long_text = "x".repeat(SUMMARY_INPUT_LIMIT * 2);

        let summary = gate.summarize("Canon AE-1", &long_text, true).await;

        assert_eq!(summary, "A working film camera.");
        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests[0].max_output_tokens, SUMMARY_MAX_TOKENS);
        assert!(requests[0].input.starts_with("Item title: Canon AE-1"));
        assert!(requests[0].input.chars().count() < SUMMARY_INPUT_LIMIT + 100);
    }
}
