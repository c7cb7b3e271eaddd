//! RSS/Atom feed client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::models::{article_id, FeedEntry};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; NewsletterDigest/1.0)";

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Api {
                status: status.as_u16(),
                message: format!("feed request to {} failed", url),
            });
        }

        let bytes = response.bytes().await?;
        let entries = parse_feed(&bytes, url)?;
        debug!(url = %url, count = entries.len(), "Parsed feed");
        Ok(entries)
    }
}

/// Parse an RSS or Atom document into raw entries.
pub fn parse_feed(bytes: &[u8], feed_url: &str) -> Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| DigestError::FeedParse(e.to_string()))?;

    let source = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| feed_url.to_string());

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| to_feed_entry(entry, &source))
        .collect())
}

fn to_feed_entry(entry: Entry, source: &str) -> FeedEntry {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_else(|| "Untitled".to_string());
    let link = select_entry_link(&entry);
    let id = article_id(&link, &entry.id, &title);

    let author = entry
        .authors
        .iter()
        .map(|p| p.name.trim())
        .find(|name| !name.is_empty())
        .map(str::to_string);

    let content_html = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|body| !body.trim().is_empty())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
        .unwrap_or_default();

    FeedEntry {
        id,
        title,
        link,
        published_at: entry.published.or(entry.updated),
        author,
        source: source.to_string(),
        content_html,
    }
}

fn select_entry_link(entry: &Entry) -> String {
    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return href.to_string();
        }
    }
    if let Some(link) = entry.links.iter().find(|l| !l.href.trim().is_empty()) {
        return link.href.trim().to_string();
    }
    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return id.to_string();
    }
    String::new()
}

/// True when the entry falls inside the trailing window. Entries without a
/// date are kept; they are stamped with the fetch time later.
pub fn within_window(entry: &FeedEntry, cutoff: DateTime<Utc>) -> bool {
    entry.published_at.map_or(true, |published| published >= cutoff)
}

/// Fetch every feed with bounded concurrency. Results come back in the
/// order of `urls`, whatever order the requests complete in.
pub async fn fetch_all<F: FeedSource>(
    source: &F,
    urls: &[String],
    concurrency: usize,
) -> Vec<(String, Result<Vec<FeedEntry>>)> {
    stream::iter(urls.iter().cloned())
        .map(|url| async move {
            let result = source.fetch(&url).await;
            (url, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>The Algorithmic Bridge</title>
    <link>https://www.thealgorithmicbridge.com</link>
    <description>AI newsletter</description>
    <item>
      <title>Scaling laws, revisited</title>
      <link>https://www.thealgorithmicbridge.com/p/scaling-laws?utm_source=rss</link>
      <guid isPermaLink="false">post-1</guid>
      <dc:creator>Alberto Romero</dc:creator>
      <pubDate>Mon, 12 Oct 2026 09:30:00 GMT</pubDate>
      <description>Short teaser</description>
      <content:encoded><![CDATA[<p>The <b>full</b> post body.</p>]]></content:encoded>
    </item>
    <item>
      <title>Undated note</title>
      <link>https://www.thealgorithmicbridge.com/p/note</link>
      <description><![CDATA[<p>Only a summary</p>]]></description>
    </item>
  </channel>
</rss>"#;

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_rss_entries() {
        let entries = parse_feed(RSS.as_bytes(), "https://www.thealgorithmicbridge.com/feed").unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "Scaling laws, revisited");
        assert_eq!(first.id, "https://www.thealgorithmicbridge.com/p/scaling-laws");
        assert_eq!(first.source, "The Algorithmic Bridge");
        assert_eq!(first.author.as_deref(), Some("Alberto Romero"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap())
        );
        assert!(first.content_html.contains("<b>full</b>"));
    }

    #[test]
    fn test_parse_falls_back_to_summary_content() {
        let entries = parse_feed(RSS.as_bytes(), "https://x/feed").unwrap();
        let second = &entries[1];
        assert!(second.content_html.contains("Only a summary"));
        assert_eq!(second.published_at, None);
        assert_eq!(second.author, None);
    }

    #[test]
    fn test_parse_atom_feed() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <title>Atom Notes</title>
  <updated>2026-10-15T10:00:00Z</updated>
  <entry>
    <id>urn:entry:1</id>
    <title>Atom post</title>
    <link rel="alternate" href="https://atom.example.com/post"/>
    <updated>2026-10-15T10:00:00Z</updated>
    <author><name>Ada</name></author>
    <content type="html">&lt;p&gt;Hello&lt;/p&gt;</content>
  </entry>
</feed>"#;
        let entries = parse_feed(atom.as_bytes(), "https://atom.example.com/feed").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://atom.example.com/post");
        assert_eq!(entries[0].source, "Atom Notes");
        assert_eq!(entries[0].author.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        let result = parse_feed(b"<html>not a feed</html>", "https://x/feed");
        assert!(matches!(result, Err(DigestError::FeedParse(_))));
    }

    // ==================== Window Tests ====================

    #[test]
    fn test_within_window() {
        let cutoff = Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap();
        let mut entry = parse_feed(RSS.as_bytes(), "u").unwrap().remove(0);

        assert!(within_window(&entry, cutoff));
        entry.published_at = Some(Utc.with_ymd_and_hms(2026, 10, 11, 23, 59, 59).unwrap());
        assert!(!within_window(&entry, cutoff));
        entry.published_at = None;
        assert!(within_window(&entry, cutoff));
    }

    // ==================== Fetch Ordering Tests ====================

    struct DelayedFeeds {
        delays_ms: HashMap<String, u64>,
    }

    #[async_trait]
    impl FeedSource for DelayedFeeds {
        async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
            let delay = self.delays_ms.get(url).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if url.contains("broken") {
                return Err(DigestError::FeedParse("bad xml".to_string()));
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_configured_order() {
        let urls: Vec<String> = vec!["slow".into(), "broken".into(), "fast".into()];
        let source = DelayedFeeds {
            delays_ms: HashMap::from([("slow".to_string(), 30), ("fast".to_string(), 0)]),
        };

        let results = fetch_all(&source, &urls, 3).await;
        let order: Vec<&str> = results.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(order, vec!["slow", "broken", "fast"]);
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }
}
