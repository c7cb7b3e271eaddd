// Public modules
pub mod config;
pub mod error;
pub mod extractor;
pub mod feeds;
pub mod ledger;
pub mod models;
pub mod paywall;
pub mod pipeline;
pub mod render;
pub mod scoring;
pub mod selection;
pub mod summarizer;

// Re-export commonly used types
pub use config::{Config, DigestSettings};
pub use error::{DigestError, Result};
pub use extractor::ContentExtractor;
pub use feeds::HttpFeedClient;
pub use ledger::{JsonFileLedger, Ledger, MemoryLedger};
pub use models::Article;
pub use pipeline::{DigestPipeline, RunReport, RunStage};
pub use render::DigestRenderer;
pub use selection::Selection;
pub use summarizer::ClaudeSummarizer;
