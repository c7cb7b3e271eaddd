use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use newsletter_digest::{
    ClaudeSummarizer, Config, ContentExtractor, DigestPipeline, DigestSettings, HttpFeedClient,
    JsonFileLedger,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "create-digest")]
#[command(about = "Build an HTML digest of recent newsletter articles, ranked and summarized")]
struct Args {
    /// JSON settings file (feeds, scoring weights, categories, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of days to look back for articles
    #[arg(short, long)]
    days: Option<i64>,

    /// Number of articles to feature with summaries
    #[arg(short, long)]
    featured: Option<usize>,

    /// Directory the digest is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ledger of already-processed articles
    #[arg(short, long)]
    ledger: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut settings =
        DigestSettings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(days) = args.days {
        settings.days_back = days;
    }
    if let Some(featured) = args.featured {
        settings.featured_count = featured;
    }
    if let Some(dir) = args.output_dir {
        settings.output_dir = dir;
    }
    if let Some(path) = args.ledger {
        settings.ledger_path = path;
    }
    settings.validate().context("Invalid settings")?;

    let config = Config::from_env().context("Failed to load API credentials")?;

    println!(
        "🚀 Starting digest generation for the past {} days ({} feeds)...",
        settings.days_back,
        settings.feeds.len()
    );

    let feeds = HttpFeedClient::new(settings.timeouts.feed())?;
    let extractor = ContentExtractor::new(settings.timeouts.scrape())?;
    let summarizer = ClaudeSummarizer::new(
        config.anthropic_api_key,
        settings.model.clone(),
        settings.max_summary_tokens,
        settings.summary_input_chars,
        settings.timeouts.summarize(),
    )?;
    let ledger = JsonFileLedger::new(settings.ledger_path.clone());

    let pipeline = DigestPipeline::new(settings, feeds, extractor, summarizer, ledger);
    let report = pipeline
        .run(Utc::now())
        .await
        .context("Failed to produce digest")?;

    println!(
        "📥 {} new articles ({} already seen, {}/{} feeds failed)",
        report.scored, report.skipped_seen, report.feeds_failed, report.feeds_total
    );
    println!(
        "⭐ {} featured, {} additional",
        report.featured, report.additional
    );
    if report.summaries_failed > 0 {
        println!("⚠ {} summaries unavailable", report.summaries_failed);
    }
    if !report.ledger_saved {
        println!("⚠ Ledger could not be saved; articles may repeat next run");
    }
    println!("\n✅ Digest saved to: {}", report.output_path.display());

    Ok(())
}
