use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use crate::error::{Result, AppError};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// One call to a text-in/text-out summarization model.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub instructions: String,
    pub input: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

/// Chat-completions client for OpenRouter.
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(OpenRouterClient {
            client,
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl Summarizer for OpenRouterClient {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::LlmError("OPENROUTER_API_KEY is not set".to_string()))?;

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: request.instructions.clone(),
                },
                Message {
                    role: "user".into(),
                    content: request.input.clone(),
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let res = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = res.json().await?;
        parse_reply(&json)
    }
}

fn parse_reply(json: &serde_json::Value) -> Result<String> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))?
        .trim();

    if reply.is_empty() {
        return Err(AppError::LlmError("LLM returned an empty reply".to_string()));
    }

    Ok(reply.to_string())
}
