//! Quality score: a length component plus an engagement component.
//!
//! Length earns nothing below `min_words`, ramps linearly up to the full
//! `length_cap` at `optimal_min`, stays there through `optimal_max`, and
//! falls off as `length_cap * optimal_max / words` beyond the band.

use crate::config::ScoringWeights;

const MAX_SCORE: u32 = 100;

pub fn length_points(word_count: usize, weights: &ScoringWeights) -> u32 {
    let cap = weights.length_cap as f64;

    if word_count < weights.min_words {
        return 0;
    }

    if word_count < weights.optimal_min {
        let span = (weights.optimal_min - weights.min_words) as f64;
        let progress = (word_count - weights.min_words) as f64 / span;
        return (cap * progress).round() as u32;
    }

    if word_count <= weights.optimal_max {
        return weights.length_cap;
    }

    (cap * weights.optimal_max as f64 / word_count as f64).round() as u32
}

pub fn engagement_points(comment_count: u32, weights: &ScoringWeights) -> u32 {
    comment_count
        .saturating_mul(weights.per_comment)
        .min(weights.engagement_cap)
}

pub fn score(word_count: usize, comment_count: u32, weights: &ScoringWeights) -> u8 {
    let total = length_points(word_count, weights)
        .saturating_add(engagement_points(comment_count, weights));
    total.min(MAX_SCORE) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> ScoringWeights {
        ScoringWeights::default()
    }

    // ==================== Length Component Tests ====================

    #[test]
    fn test_length_zero_below_minimum() {
        assert_eq!(length_points(0, &weights()), 0);
        assert_eq!(length_points(99, &weights()), 0);
        assert_eq!(length_points(100, &weights()), 0);
    }

    #[test]
    fn test_length_ramps_toward_band() {
        assert_eq!(length_points(300, &weights()), 25);
        assert_eq!(length_points(499, &weights()), 50);
    }

    #[test]
    fn test_length_full_inside_band() {
        for words in (500..=2000).step_by(50) {
            assert_eq!(length_points(words, &weights()), 50, "words = {}", words);
        }
        assert_eq!(length_points(2000, &weights()), 50);
    }

    #[test]
    fn test_length_falls_off_above_band() {
        assert_eq!(length_points(4000, &weights()), 25);
        assert_eq!(length_points(8000, &weights()), 13);
        assert_eq!(length_points(1_000_000, &weights()), 0);
    }

    #[test]
    fn test_length_monotonic_outside_band() {
        let w = weights();
        let mut previous = 0;
        for words in 0..500 {
            let points = length_points(words, &w);
            assert!(points >= previous);
            previous = points;
        }
        let mut previous = 50;
        for words in (2000..20_000).step_by(37) {
            let points = length_points(words, &w);
            assert!(points <= previous);
            previous = points;
        }
    }

    #[test]
    fn test_length_with_collapsed_ramp() {
        let w = ScoringWeights {
            min_words: 500,
            ..ScoringWeights::default()
        };
        assert_eq!(length_points(499, &w), 0);
        assert_eq!(length_points(500, &w), 50);
    }

    // ==================== Engagement Component Tests ====================

    #[test]
    fn test_engagement_five_points_per_comment() {
        assert_eq!(engagement_points(0, &weights()), 0);
        assert_eq!(engagement_points(1, &weights()), 5);
        assert_eq!(engagement_points(7, &weights()), 35);
    }

    #[test]
    fn test_engagement_saturates_at_ten_comments() {
        for comments in [10, 11, 50, 10_000, u32::MAX] {
            assert_eq!(engagement_points(comments, &weights()), 50);
        }
    }

    // ==================== Total Score Tests ====================

    #[test]
    fn test_score_zero_for_empty_article() {
        assert_eq!(score(0, 0, &weights()), 0);
    }

    #[test]
    fn test_score_maximum() {
        assert_eq!(score(1200, 25, &weights()), 100);
    }

    #[test]
    fn test_score_bounded_and_monotonic_in_comments() {
        let w = weights();
        for words in [0, 50, 150, 499, 500, 1500, 2001, 9000] {
            let mut previous = 0;
            for comments in 0..30 {
                let s = score(words, comments, &w);
                assert!(s <= 100);
                assert!(s >= previous);
                previous = s;
            }
        }
    }

    #[test]
    fn test_score_clamped_with_generous_weights() {
        let w = ScoringWeights {
            length_cap: 80,
            engagement_cap: 80,
            ..ScoringWeights::default()
        };
        assert_eq!(score(1000, 100, &w), 100);
    }

    #[test]
    fn test_score_clamped_with_extreme_caps() {
        let w = ScoringWeights {
            length_cap: u32::MAX,
            engagement_cap: u32::MAX,
            per_comment: u32::MAX,
            ..ScoringWeights::default()
        };
        assert_eq!(score(1000, 10, &w), 100);
    }
}
