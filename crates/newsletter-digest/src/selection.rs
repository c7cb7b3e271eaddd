use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::CategoryRule;
use crate::models::Article;

/// Articles split into the featured section and the category-grouped rest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub featured: Vec<Article>,
    pub additional: BTreeMap<String, Vec<Article>>,
}

impl Selection {
    pub fn additional_count(&self) -> usize {
        self.additional.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.featured.is_empty() && self.additional.is_empty()
    }

    /// Category groups ordered for display: largest first, then by name.
    pub fn categories_by_size(&self) -> Vec<(&str, &[Article])> {
        let mut groups: Vec<(&str, &[Article])> = self
            .additional
            .iter()
            .map(|(name, articles)| (name.as_str(), articles.as_slice()))
            .collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
        groups
    }
}

/// Ranking order: score desc, then most recent first, then id.
pub fn rank_order(a: &Article, b: &Article) -> Ordering {
    b.quality_score
        .cmp(&a.quality_score)
        .then_with(|| b.published_at.cmp(&a.published_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn select(mut articles: Vec<Article>, featured_count: usize) -> Selection {
    articles.sort_by(rank_order);

    let split = featured_count.min(articles.len());
    let remainder = articles.split_off(split);

    let mut additional: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in remainder {
        additional
            .entry(article.category.clone())
            .or_default()
            .push(article);
    }

    Selection {
        featured: articles,
        additional,
    }
}

/// Map an article onto the static category table.
///
/// Source names are checked first across all rules, then title keywords,
/// then body keywords; the first hit wins.
pub fn categorize(
    source: &str,
    title: &str,
    body: &str,
    rules: &[CategoryRule],
    default_category: &str,
) -> String {
    if let Some(rule) = rules
        .iter()
        .find(|rule| rule.sources.iter().any(|s| s == source))
    {
        return rule.name.clone();
    }

    let title = title.to_lowercase();
    let body = body.to_lowercase();

    for haystack in [&title, &body] {
        if let Some(rule) = rules.iter().find(|rule| {
            rule.keywords
                .iter()
                .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
        }) {
            return rule.name.clone();
        }
    }

    default_category.to_string()
}
