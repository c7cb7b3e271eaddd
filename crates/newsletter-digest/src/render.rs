use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

use crate::error::{DigestError, Result};
use crate::models::Article;
use crate::selection::Selection;
use crate::summarizer::FALLBACK_SUMMARY;

pub struct DigestRenderer {
    output_dir: PathBuf,
}

impl DigestRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn file_name(generated_at: DateTime<Utc>) -> String {
        format!("ai_digest_{}.html", generated_at.format("%Y%m%d_%H%M%S"))
    }

    pub fn generate(selection: &Selection, generated_at: DateTime<Utc>) -> String {
        let mut html = String::new();

        // Format date as "October 19, 2026"
        let formatted_date = generated_at.format("%B %-d, %Y").to_string();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(&format!(
            "  <title>AI Newsletter Digest - {}</title>\n",
            formatted_date
        ));
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; line-height: 1.6; color: #333; }\n");
        html.push_str("    .header { border-bottom: 2px solid #333; margin-bottom: 30px; padding-bottom: 20px; }\n");
        html.push_str("    .featured { background: #f8f9fa; padding: 25px; margin: 25px 0; border-radius: 10px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }\n");
        html.push_str("    .title { font-size: 20px; font-weight: bold; margin-bottom: 12px; }\n");
        html.push_str("    .title a, .other-title a { text-decoration: none; color: #333; }\n");
        html.push_str("    .title a:hover, .other-title a:hover { color: #007acc; }\n");
        html.push_str("    .meta { color: #666; font-size: 14px; margin-bottom: 15px; }\n");
        html.push_str("    .summary { margin-bottom: 15px; font-size: 16px; }\n");
        html.push_str("    .metrics { font-size: 13px; color: #888; background: #f0f0f0; padding: 10px; border-radius: 5px; }\n");
        html.push_str("    .paywall { color: #ff6b35; font-weight: bold; font-size: 12px; }\n");
        html.push_str("    .category-title { font-size: 22px; font-weight: bold; margin: 35px 0 15px 0; border-bottom: 2px solid #007acc; padding-bottom: 8px; text-transform: uppercase; letter-spacing: 1px; }\n");
        html.push_str("    .other-article { padding: 15px; margin-bottom: 12px; background: #f8f9fa; border-radius: 6px; }\n");
        html.push_str("    .other-title { font-weight: bold; margin-bottom: 5px; }\n");
        html.push_str("    .other-meta { font-size: 12px; color: #666; }\n");
        html.push_str("    .empty { color: #888; font-style: italic; }\n");
        html.push_str("    .footer { margin-top: 50px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 14px; text-align: center; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");

        html.push_str("<div class=\"header\">\n");
        html.push_str("  <h1>AI Newsletter Digest</h1>\n");
        html.push_str(&format!(
            "  <p><strong>{}</strong> | {} Featured Articles | {} Additional Articles</p>\n",
            formatted_date,
            selection.featured.len(),
            selection.additional_count()
        ));
        html.push_str("  <p><small>Curated from AI newsletters by content length and reader engagement</small></p>\n");
        html.push_str("</div>\n");

        if selection.is_empty() {
            html.push_str("<p class=\"empty\">No new articles were found for this period.</p>\n");
        }

        if !selection.featured.is_empty() {
            html.push_str("<h2>Featured Articles</h2>\n");
            for article in &selection.featured {
                Self::push_featured(&mut html, article);
            }
        }

        if !selection.additional.is_empty() {
            html.push_str("<h2>Additional Articles by Category</h2>\n");
            for (category, articles) in selection.categories_by_size() {
                html.push_str(&format!(
                    "<div class=\"category-title\">{} ({} articles)</div>\n",
                    Self::escape_html(category),
                    articles.len()
                ));
                for article in articles {
                    Self::push_additional(&mut html, article);
                }
            }
        }

        html.push_str("<div class=\"footer\">\n");
        html.push_str("  <p>Generated automatically by AI Newsletter Digest</p>\n");
        html.push_str("  <p><small>Quality scoring based on content length and community engagement</small></p>\n");
        html.push_str("</div>\n");

        html.push_str("</body>\n</html>");
        html
    }

    fn push_featured(html: &mut String, article: &Article) {
        let paywall = if article.is_paywalled {
            " <span class=\"paywall\">PAYWALLED</span>"
        } else {
            ""
        };
        let summary = article.summary.as_deref().unwrap_or(FALLBACK_SUMMARY);

        html.push_str("<div class=\"featured\">\n");
        html.push_str(&format!(
            "  <div class=\"title\"><a href=\"{}\" target=\"_blank\">{}</a>{}</div>\n",
            Self::escape_html(&article.link),
            Self::escape_html(&article.title),
            paywall
        ));
        html.push_str(&format!(
            "  <div class=\"meta\">By {} | {} | {}</div>\n",
            Self::escape_html(&article.author),
            Self::escape_html(&article.source),
            article.published_at.format("%B %-d, %Y")
        ));
        html.push_str(&format!(
            "  <div class=\"summary\">{}</div>\n",
            Self::escape_html(summary)
        ));
        html.push_str(&format!(
            "  <div class=\"metrics\">Quality Score: {} | Words: {} | {} comments</div>\n",
            article.quality_score, article.word_count, article.comment_count
        ));
        html.push_str("</div>\n");
    }

    fn push_additional(html: &mut String, article: &Article) {
        let paywall = if article.is_paywalled {
            " <span class=\"paywall\">(paywalled)</span>"
        } else {
            ""
        };

        html.push_str("<div class=\"other-article\">\n");
        html.push_str(&format!(
            "  <div class=\"other-title\"><a href=\"{}\" target=\"_blank\">{}</a>{}</div>\n",
            Self::escape_html(&article.link),
            Self::escape_html(&article.title),
            paywall
        ));
        html.push_str(&format!(
            "  <div class=\"other-meta\">{} | {} | Score: {} | {} comments</div>\n",
            Self::escape_html(&article.author),
            Self::escape_html(&article.source),
            article.quality_score,
            article.comment_count
        ));
        html.push_str("</div>\n");
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Write the digest next to earlier ones, named by generation time.
    pub fn save(&self, content: &str, generated_at: DateTime<Utc>) -> Result<PathBuf> {
        let filepath = self.output_dir.join(Self::file_name(generated_at));

        fs::write(&filepath, content).map_err(|source| DigestError::Output {
            path: filepath.clone(),
            source,
        })?;

        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn article(id: &str, title: &str, category: &str) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", id),
            published_at: Utc.with_ymd_and_hms(2026, 10, 14, 8, 0, 0).unwrap(),
            author: "Author".to_string(),
            source: "Example Letter".to_string(),
            body_text: String::new(),
            word_count: 1234,
            comment_count: 4,
            quality_score: 62,
            is_paywalled: false,
            category: category.to_string(),
            summary: None,
        }
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 7, 5, 9).unwrap()
    }

    // ==================== HTML Escaping Tests ====================

    #[test]
    fn test_escape_html_ampersand() {
        assert_eq!(DigestRenderer::escape_html("A & B"), "A &amp; B");
    }

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            DigestRenderer::escape_html("<a href=\"test\">It's & Go</a>"),
            "&lt;a href=&quot;test&quot;&gt;It&#39;s &amp; Go&lt;/a&gt;"
        );
    }

    // ==================== HTML Generation Tests ====================

    #[test]
    fn test_file_name_uses_timestamp() {
        assert_eq!(DigestRenderer::file_name(date()), "ai_digest_20261019_070509.html");
    }

    #[test]
    fn test_generate_featured_section() {
        let mut featured = article("one", "Agents & Tools", "Dev");
        featured.summary = Some("A crisp summary.".to_string());
        featured.is_paywalled = true;
        let selection = Selection {
            featured: vec![featured],
            additional: BTreeMap::new(),
        };

        let html = DigestRenderer::generate(&selection, date());

        assert!(html.contains("October 19, 2026"));
        assert!(html.contains("1 Featured Articles | 0 Additional Articles"));
        assert!(html.contains("Agents &amp; Tools"));
        assert!(html.contains("href=\"https://example.com/one\""));
        assert!(html.contains("A crisp summary."));
        assert!(html.contains("PAYWALLED"));
        assert!(html.contains("Quality Score: 62 | Words: 1234 | 4 comments"));
        assert!(!html.contains("Additional Articles by Category"));
    }

    #[test]
    fn test_generate_featured_without_summary_uses_fallback() {
        let selection = Selection {
            featured: vec![article("one", "Title", "Dev")],
            additional: BTreeMap::new(),
        };
        let html = DigestRenderer::generate(&selection, date());
        assert!(html.contains(FALLBACK_SUMMARY));
    }

    #[test]
    fn test_generate_additional_grouped_largest_first() {
        let mut additional = BTreeMap::new();
        additional.insert("Alpha".to_string(), vec![article("a", "Alpha post", "Alpha")]);
        additional.insert(
            "Zeta".to_string(),
            vec![article("z1", "Zeta one", "Zeta"), article("z2", "Zeta two", "Zeta")],
        );
        let selection = Selection {
            featured: Vec::new(),
            additional,
        };

        let html = DigestRenderer::generate(&selection, date());

        let zeta = html.find("Zeta (2 articles)").unwrap();
        let alpha = html.find("Alpha (1 articles)").unwrap();
        assert!(zeta < alpha);
        assert!(html.contains("Score: 62"));
        assert!(html.contains("0 Featured Articles | 3 Additional Articles"));
    }

    #[test]
    fn test_generate_empty_digest() {
        let html = DigestRenderer::generate(&Selection::default(), date());
        assert!(html.contains("No new articles"));
        assert!(html.ends_with("</html>"));
    }

    // ==================== Save Tests ====================

    #[test]
    fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = DigestRenderer::new(dir.path());
        let path = renderer.save("<html></html>", date()).unwrap();

        assert_eq!(path, dir.path().join("ai_digest_20261019_070509.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = DigestRenderer::new(dir.path().join("missing").join("nested"));
        let result = renderer.save("<html></html>", date());
        assert!(matches!(result, Err(DigestError::Output { .. })));
    }
}
