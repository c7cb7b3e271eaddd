use crate::config::PaywallRules;
use crate::models::word_count;

/// Heuristic paywall flag: an indicator phrase in the text or title, or
/// text so short it was probably cut off by a subscriber gate.
pub fn detect_paywall(text: &str, title: &str, rules: &PaywallRules) -> bool {
    let text_lower = text.to_lowercase();
    let title_lower = title.to_lowercase();

    let has_indicator = rules.indicators.iter().any(|indicator| {
        let indicator = indicator.to_lowercase();
        text_lower.contains(&indicator) || title_lower.contains(&indicator)
    });

    has_indicator || word_count(text) < rules.min_words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "word ".repeat(200)
    }

    #[test]
    fn test_full_article_is_not_paywalled() {
        assert!(!detect_paywall(&long_text(), "A free post", &PaywallRules::default()));
    }

    #[test]
    fn test_indicator_in_text() {
        let text = format!("{} This post is for Paid Subscribers", long_text());
        assert!(detect_paywall(&text, "Title", &PaywallRules::default()));
    }

    #[test]
    fn test_indicator_in_title() {
        assert!(detect_paywall(&long_text(), "Members only: Q3 notes", &PaywallRules::default()));
    }

    #[test]
    fn test_short_text_is_flagged() {
        assert!(detect_paywall("Just a teaser.", "Title", &PaywallRules::default()));
        assert!(detect_paywall("", "Title", &PaywallRules::default()));
    }
}
