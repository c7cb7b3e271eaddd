use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::feeds::USER_AGENT;

/// What the extractor learned from an article page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub text: String,
    pub comment_count: u32,
}

#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedPage>;
}

pub struct ContentExtractor {
    client: Client,
    comments: CommentCounter,
}

impl ContentExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            comments: CommentCounter::new()?,
        })
    }
}

#[async_trait]
impl PageExtractor for ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedPage> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Api {
                status: status.as_u16(),
                message: format!("page request to {} failed", url),
            });
        }

        let html = response.text().await?;

        let text = html2text::from_read(html.as_bytes(), 100);
        let comment_count = self.comments.count(&html);
        debug!(url = %url, comment_count, "Extracted page");

        Ok(ExtractedPage {
            text: text.trim().to_string(),
            comment_count,
        })
    }
}

/// Finds the comment count a newsletter page shows, e.g. "12 comments".
pub struct CommentCounter {
    text_patterns: Vec<Regex>,
    comment_href: Regex,
    number: Regex,
    anchors: Selector,
}

impl CommentCounter {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| DigestError::InvalidConfig(e.to_string()))
        };

        let text_patterns = [
            r"(?i)(\d+)\s+comments?(?:\s|$)",
            r"(?i)(\d+)\s+replies?(?:\s|$)",
            r"(?i)comments?\s*\((\d+)\)",
            r"(?i)replies?\s*\((\d+)\)",
        ]
        .into_iter()
        .map(compile)
        .collect::<Result<Vec<_>>>()?;

        let anchors = Selector::parse("a[href]")
            .map_err(|e| DigestError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            text_patterns,
            comment_href: compile(r"(?i)#?comments?")?,
            number: compile(r"(\d+)")?,
            anchors,
        })
    }

    /// The first text pattern with any match wins and yields its largest
    /// number; otherwise the first comment link with a number in its text.
    pub fn count(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        let page_text = document.root_element().text().collect::<Vec<_>>().join(" ");

        for pattern in &self.text_patterns {
            let best = pattern
                .captures_iter(&page_text)
                .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
                .max();
            if let Some(count) = best {
                return count;
            }
        }

        document
            .select(&self.anchors)
            .filter(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| self.comment_href.is_match(href))
            })
            .find_map(|a| {
                let text = a.text().collect::<String>();
                self.number.captures(&text)?.get(1)?.as_str().parse().ok()
            })
            .unwrap_or(0)
    }
}

/// Flatten an HTML fragment (feed content) to its visible text.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
