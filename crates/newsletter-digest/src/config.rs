use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DigestError, Result};

const API_KEY_VARS: [&str; 2] = ["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"];

/// Secrets supplied out-of-band through the environment or a `.env` file.
#[derive(Clone)]
pub struct Config {
    pub anthropic_api_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("anthropic_api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let anthropic_api_key = API_KEY_VARS
            .iter()
            .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                DigestError::MissingConfig(
                    "CLAUDE_API_KEY not found.\n\n\
                    To fix this, create ~/.config/newsletter-digest/.env with:\n  \
                    CLAUDE_API_KEY=your_key_here\n\n\
                    Get your Anthropic API key from: https://console.anthropic.com/settings/keys"
                        .to_string(),
                )
            })?;

        Ok(Self { anthropic_api_key })
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/newsletter-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("newsletter-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Weights and thresholds of the quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Articles shorter than this earn no length points
    pub min_words: usize,
    pub optimal_min: usize,
    pub optimal_max: usize,
    pub length_cap: u32,
    pub per_comment: u32,
    pub engagement_cap: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            min_words: 100,
            optimal_min: 500,
            optimal_max: 2000,
            length_cap: 50,
            per_comment: 5,
            engagement_cap: 50,
        }
    }
}

/// One row of the static category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    /// Feed titles that always land in this category
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, sources: &[&str], keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaywallRules {
    pub indicators: Vec<String>,
    /// Content below this many words is assumed to be cut off
    pub min_words: usize,
}

impl Default for PaywallRules {
    fn default() -> Self {
        Self {
            indicators: [
                "subscribe to continue reading",
                "this post is for paid subscribers",
                "upgrade to paid",
                "become a paid subscriber",
                "this content is for subscribers only",
                "premium subscribers only",
                "subscribe now to read more",
                "paywall",
                "members only",
                "paid tier",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_words: 50,
        }
    }
}

/// Per-call timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub feed_secs: u64,
    pub scrape_secs: u64,
    pub summarize_secs: u64,
}

impl Timeouts {
    pub fn feed(&self) -> Duration {
        Duration::from_secs(self.feed_secs)
    }

    pub fn scrape(&self) -> Duration {
        Duration::from_secs(self.scrape_secs)
    }

    pub fn summarize(&self) -> Duration {
        Duration::from_secs(self.summarize_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            feed_secs: 10,
            scrape_secs: 10,
            summarize_secs: 60,
        }
    }
}

/// Static run configuration. Every field has a default so a partial JSON
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    pub feeds: Vec<String>,
    pub days_back: i64,
    pub featured_count: usize,
    pub scoring: ScoringWeights,
    pub categories: Vec<CategoryRule>,
    pub default_category: String,
    pub paywall: PaywallRules,
    pub timeouts: Timeouts,
    /// Pause between consecutive requests to the same kind of endpoint
    pub request_delay_ms: u64,
    pub feed_concurrency: usize,
    pub summary_input_chars: usize,
    pub model: String,
    pub max_summary_tokens: u32,
    pub ledger_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            days_back: 7,
            featured_count: 7,
            scoring: ScoringWeights::default(),
            categories: default_categories(),
            default_category: "Uncategorized".to_string(),
            paywall: PaywallRules::default(),
            timeouts: Timeouts::default(),
            request_delay_ms: 1500,
            feed_concurrency: 4,
            summary_input_chars: 4000,
            model: "claude-3-5-haiku-20241022".to_string(),
            max_summary_tokens: 200,
            ledger_path: PathBuf::from("processed_articles.json"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl DigestSettings {
    /// Load settings from a JSON file, or the built-in defaults when no path
    /// is given. A named file that cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    DigestError::InvalidConfig(format!(
                        "cannot read settings file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                serde_json::from_str::<DigestSettings>(&content).map_err(|e| {
                    DigestError::InvalidConfig(format!(
                        "cannot parse settings file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Self::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.scoring;
        if w.min_words > w.optimal_min {
            return Err(DigestError::InvalidConfig(format!(
                "scoring.min_words ({}) exceeds scoring.optimal_min ({})",
                w.min_words, w.optimal_min
            )));
        }
        if w.optimal_min > w.optimal_max {
            return Err(DigestError::InvalidConfig(format!(
                "scoring.optimal_min ({}) exceeds scoring.optimal_max ({})",
                w.optimal_min, w.optimal_max
            )));
        }
        if self.days_back < 0 {
            return Err(DigestError::InvalidConfig(
                "days_back must not be negative".to_string(),
            ));
        }
        if self.feeds.is_empty() {
            return Err(DigestError::InvalidConfig(
                "at least one feed URL is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn default_feeds() -> Vec<String> {
    [
        "https://karozieminski.substack.com/feed",
        "https://designwithai.substack.com/feed",
        "https://thestrategystack.substack.com/feed",
        "https://www.lennysnewsletter.com/feed",
        "https://kp.substack.com/feed",
        "https://inferencebysequoia.substack.com/feed",
        "https://aimaker.substack.com/feed",
        "https://www.buildtolaunch.ai/feed",
        "https://leadershipinchange10.substack.com/feed",
        "https://aiblewmymind.substack.com/feed",
        "https://ileanamarcut.substack.com/feed",
        "https://sixpeas.substack.com/feed",
        "https://aigovernancelead.substack.com/feed",
        "https://aihumanity.substack.com/feed",
        "https://ab2ai.substack.com/feed",
        "https://aicadence.co/feed",
        "https://betteconnects.substack.com/feed",
        "https://www.sabrina.dev/feed",
        "https://businessengineer.ai/feed",
        "https://www.thealgorithmicbridge.com/feed",
        "https://nlp.elvissaravia.com/feed",
        "https://www.4ir.news/feed",
        "https://techtiff.substack.com/feed",
        "https://www.luizasnewsletter.com/feed",
        "https://www.productcompass.pm/feed",
        "https://www.the-founders-corner.com/feed",
        "https://newsletter.techworld-with-milan.com/feed",
        "https://learn.thedesignsystem.guide/feed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "AI News & Updates",
            &["4IR - Daily AI News"],
            &["announces", "launch", "release", "this week in ai"],
        ),
        CategoryRule::new(
            "AI Governance & Ethics",
            &[
                "AI Governance, Ethics and Leadership",
                "Luiza's Newsletter",
                "AI For Humanity",
            ],
            &["governance", "ethics", "regulation", "privacy", "policy"],
        ),
        CategoryRule::new(
            "AI Research & Technical",
            &[
                "Inference by Sequoia Capital",
                "AI Newsletter",
                "The Algorithmic Bridge",
                "AI blew my mind",
                "The AI Maker",
            ],
            &["research", "paper", "benchmark", "model", "llm"],
        ),
        CategoryRule::new(
            "Strategy & Business",
            &["The Strategy Stack", "The Business Engineer", "AI Cadence"],
            &["strategy", "business", "market", "revenue"],
        ),
        CategoryRule::new(
            "Product & Entrepreneurship",
            &[
                "Lenny's Newsletter",
                "The Founders Corner®",
                "Design with AI",
                "The Product Compass",
                "Build to Launch",
                "Product with Attitude",
            ],
            &["product", "startup", "founder", "design"],
        ),
        CategoryRule::new(
            "Leadership & Career",
            &["Leadership in Change", "AI Can Do That? 🔍", "KP's Column"],
            &["leadership", "career", "team", "manager"],
        ),
        CategoryRule::new(
            "Development & Tools",
            &[
                "The AI Creator Drop",
                "Sabrina Ramonov 🍄",
                "Tech World With Milan Newsletter",
                "The Design System Guide",
            ],
            &["code", "developer", "tool", "workflow", "prompt"],
        ),
        CategoryRule::new(
            "AI Analysis & Insights",
            &["6 'P's in AI Pods (AI6P)"],
            &[],
        ),
    ]
}
