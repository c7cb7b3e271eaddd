use chrono::{DateTime, Utc};
use url::Url;

/// Anything that carries a stable article identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A raw entry as returned by a feed, before enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub source: String,
    pub content_html: String,
}

impl Identified for FeedEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One feed entry after content extraction and scoring
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
    pub source: String,
    pub body_text: String,
    pub word_count: usize,
    pub comment_count: u32,
    pub quality_score: u8,
    pub is_paywalled: bool,
    pub category: String,
    pub summary: Option<String>,
}

impl Identified for Article {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Derive the stable identifier of an entry.
///
/// The link wins when present, normalized so that fragments and `utm_*`
/// tracking parameters do not produce distinct ids for the same post.
/// Entries without a link fall back to their feed GUID, then to the title.
pub fn article_id(link: &str, guid: &str, title: &str) -> String {
    let link = link.trim();
    if !link.is_empty() {
        return normalize_link(link);
    }

    let guid = guid.trim();
    if !guid.is_empty() {
        return guid.to_string();
    }

    format!("title:{}", title.trim())
}

fn normalize_link(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}
