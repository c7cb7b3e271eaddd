//! One digest run: fetch, filter, score, select, summarize, render, persist.
//!
//! Collaborator failures are absorbed where they happen and turned into
//! degraded data. The only failure that ends a run is not being able to
//! write the digest file.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::DigestSettings;
use crate::error::Result;
use crate::extractor::{html_to_text, ExtractedPage, PageExtractor};
use crate::feeds::{self, FeedSource};
use crate::ledger::{self, Ledger};
use crate::models::{word_count, Article, FeedEntry};
use crate::paywall::detect_paywall;
use crate::render::DigestRenderer;
use crate::scoring;
use crate::selection::{self, categorize};
use crate::summarizer::{Summarizer, FALLBACK_SUMMARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Fetch,
    Filter,
    Score,
    Select,
    Summarize,
    Render,
    Persist,
    Done,
    Error,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Init => "init",
            RunStage::Fetch => "fetch",
            RunStage::Filter => "filter",
            RunStage::Score => "score",
            RunStage::Select => "select",
            RunStage::Summarize => "summarize",
            RunStage::Render => "render",
            RunStage::Persist => "persist",
            RunStage::Done => "done",
            RunStage::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct StageTracker {
    visited: Vec<RunStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            visited: vec![RunStage::Init],
        }
    }

    fn enter(&mut self, stage: RunStage) {
        info!(stage = %stage, "Entering stage");
        self.visited.push(stage);
    }

    fn current(&self) -> RunStage {
        self.visited.last().copied().unwrap_or(RunStage::Init)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub stages: Vec<RunStage>,
    pub feeds_total: usize,
    pub feeds_failed: usize,
    pub fetched: usize,
    pub skipped_seen: usize,
    pub scored: usize,
    pub featured: usize,
    pub additional: usize,
    pub summaries_failed: usize,
    pub ledger_saved: bool,
}

/// Oldest publish time kept by a run. A window reaching past the
/// representable range keeps everything.
fn window_start(now: DateTime<Utc>, days_back: i64) -> DateTime<Utc> {
    Duration::try_days(days_back)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct DigestPipeline<F, X, S, L> {
    settings: DigestSettings,
    feeds: F,
    extractor: X,
    summarizer: S,
    ledger: L,
    renderer: DigestRenderer,
}

impl<F, X, S, L> DigestPipeline<F, X, S, L>
where
    F: FeedSource,
    X: PageExtractor,
    S: Summarizer,
    L: Ledger,
{
    pub fn new(settings: DigestSettings, feeds: F, extractor: X, summarizer: S, ledger: L) -> Self {
        let renderer = DigestRenderer::new(settings.output_dir.clone());
        Self {
            settings,
            feeds,
            extractor,
            summarizer,
            ledger,
            renderer,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let mut tracker = StageTracker::new();

        match self.execute(now, &mut tracker).await {
            Ok(mut report) => {
                tracker.enter(RunStage::Done);
                report.stages = tracker.visited;
                Ok(report)
            }
            Err(e) => {
                error!(
                    failed_stage = %tracker.current(),
                    stage = %RunStage::Error,
                    error = %e,
                    "Digest run failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, now: DateTime<Utc>, tracker: &mut StageTracker) -> Result<RunReport> {
        tracker.enter(RunStage::Fetch);
        let (entries, feeds_failed) = self.fetch(now).await;
        let fetched = entries.len();

        tracker.enter(RunStage::Filter);
        let seen = self.ledger.load();
        let fresh = ledger::filter_new(entries, &seen);
        let skipped_seen = fetched - fresh.len();
        info!(fetched, skipped_seen, new = fresh.len(), "Filtered already-seen articles");

        tracker.enter(RunStage::Score);
        let articles = self.score(fresh, now).await;
        let scored_ids: Vec<String> = articles.iter().map(|a| a.id.clone()).collect();

        tracker.enter(RunStage::Select);
        let mut selection = selection::select(articles, self.settings.featured_count);
        info!(
            featured = selection.featured.len(),
            additional = selection.additional_count(),
            "Selected articles"
        );

        tracker.enter(RunStage::Summarize);
        let summaries_failed = self.summarize(&mut selection.featured).await;

        tracker.enter(RunStage::Render);
        let html = DigestRenderer::generate(&selection, now);
        let output_path = self.renderer.save(&html, now)?;
        info!(path = %output_path.display(), "Digest written");

        tracker.enter(RunStage::Persist);
        let updated = ledger::record(seen, scored_ids.iter().cloned());
        let ledger_saved = match self.ledger.persist(&updated) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to save ledger; these articles may be processed again");
                false
            }
        };

        Ok(RunReport {
            output_path,
            stages: Vec::new(),
            feeds_total: self.settings.feeds.len(),
            feeds_failed,
            fetched,
            skipped_seen,
            scored: scored_ids.len(),
            featured: selection.featured.len(),
            additional: selection.additional_count(),
            summaries_failed,
            ledger_saved,
        })
    }

    /// Pull every feed, keep entries inside the window and drop ids already
    /// seen earlier in this run. Returns the entries and the failed feed count.
    async fn fetch(&self, now: DateTime<Utc>) -> (Vec<FeedEntry>, usize) {
        let cutoff = window_start(now, self.settings.days_back);
        let results =
            feeds::fetch_all(&self.feeds, &self.settings.feeds, self.settings.feed_concurrency)
                .await;

        let mut entries = Vec::new();
        let mut ids = HashSet::new();
        let mut failed = 0;

        for (url, result) in results {
            match result {
                Ok(feed_entries) => {
                    let total = feed_entries.len();
                    let recent: Vec<FeedEntry> = feed_entries
                        .into_iter()
                        .filter(|e| feeds::within_window(e, cutoff))
                        .filter(|e| ids.insert(e.id.clone()))
                        .collect();
                    info!(url = %url, total, recent = recent.len(), "Fetched feed");
                    entries.extend(recent);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to fetch feed, skipping");
                    failed += 1;
                }
            }
        }

        (entries, failed)
    }

    async fn score(&self, entries: Vec<FeedEntry>, now: DateTime<Utc>) -> Vec<Article> {
        let mut articles = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }

            let page = match self.extractor.extract(&entry.link).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %entry.link, error = %e, "Failed to scrape article, scoring without it");
                    ExtractedPage::default()
                }
            };

            articles.push(self.enrich(entry, page, now));
        }

        articles
    }

    fn enrich(&self, entry: FeedEntry, page: ExtractedPage, now: DateTime<Utc>) -> Article {
        let settings = &self.settings;

        let feed_text = html_to_text(&entry.content_html);
        let body_text = if feed_text.is_empty() {
            page.text
        } else {
            feed_text
        };
        let words = word_count(&body_text);

        let quality_score = scoring::score(words, page.comment_count, &settings.scoring);
        let is_paywalled = detect_paywall(&body_text, &entry.title, &settings.paywall);
        let category = categorize(
            &entry.source,
            &entry.title,
            &body_text,
            &settings.categories,
            &settings.default_category,
        );

        debug!(
            id = %entry.id,
            words,
            comments = page.comment_count,
            score = quality_score,
            "Scored article"
        );

        Article {
            id: entry.id,
            title: entry.title,
            link: entry.link,
            published_at: entry.published_at.unwrap_or(now),
            author: entry.author.unwrap_or_else(|| "Unknown".to_string()),
            source: entry.source,
            body_text,
            word_count: words,
            comment_count: page.comment_count,
            quality_score,
            is_paywalled,
            category,
            summary: None,
        }
    }

    /// Summarize featured articles one at a time. Returns how many fell back.
    async fn summarize(&self, featured: &mut [Article]) -> usize {
        let mut failed = 0;

        for (index, article) in featured.iter_mut().enumerate() {
            if index > 0 {
                self.pause().await;
            }

            let summary = match self.summarizer.summarize(article).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(title = %article.title, error = %e, "Failed to summarize article");
                    failed += 1;
                    FALLBACK_SUMMARY.to_string()
                }
            };
            article.summary = Some(summary);
        }

        failed
    }

    async fn pause(&self) {
        let delay = self.settings.request_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
