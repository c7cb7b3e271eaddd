use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DigestError, Result};
use crate::models::Article;

/// Placeholder rendered when an article could not be summarized
pub const FALLBACK_SUMMARY: &str = "Summary unavailable.";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, article: &Article) -> Result<String>;
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

pub struct ClaudeSummarizer {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_input_chars: usize,
}

impl ClaudeSummarizer {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        max_input_chars: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens,
            max_input_chars,
        })
    }

    fn build_prompt(&self, article: &Article) -> String {
        format!(
            r#"Please provide a concise 2-3 sentence summary of this AI/tech newsletter article.

Title: {}
Author: {}
Source: {}

Content: {}

Focus on the key insights, developments, or arguments presented. Respond with the summary only."#,
            article.title,
            article.author,
            article.source,
            truncate_utf8(&article.body_text, self.max_input_chars)
        )
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn summarize(&self, article: &Article) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: self.build_prompt(article),
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(DigestError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_summary(&body)
    }
}

fn parse_summary(body: &str) -> Result<String> {
    let response: ClaudeResponse = serde_json::from_str(body)
        .map_err(|e| DigestError::MalformedResponse(format!("Claude response: {}", e)))?;

    let text = response
        .content
        .iter()
        .map(|c| c.text.trim())
        .find(|t| !t.is_empty())
        .ok_or_else(|| DigestError::MalformedResponse("Claude returned no text".to_string()))?;

    Ok(text.to_string())
}

/// Cut `text` to at most `max_bytes`, backing off to a UTF-8 boundary.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
