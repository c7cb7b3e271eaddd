//! Dedup ledger: the set of article ids processed by earlier runs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{article_id, Identified};

pub type SeenSet = BTreeSet<String>;

const LEDGER_VERSION: &str = "1.0";

/// Storage backing for the seen-id set.
pub trait Ledger {
    /// Never fails: an unreadable store is reported and treated as empty.
    fn load(&self) -> SeenSet;

    fn persist(&self, seen: &SeenSet) -> Result<()>;
}

/// Keep only the items whose id has not been seen before.
pub fn filter_new<T: Identified>(items: Vec<T>, seen: &SeenSet) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| !seen.contains(item.id()))
        .collect()
}

pub fn record<I>(mut seen: SeenSet, new_ids: I) -> SeenSet
where
    I: IntoIterator<Item = String>,
{
    seen.extend(new_ids);
    seen
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    updated_at: String,
    seen: Vec<String>,
}

/// Tracking file written by the earlier script: every processed article with
/// its link, split into featured and reviewed lists.
#[derive(Debug, Deserialize)]
struct LegacyLedgerFile {
    featured: Option<Vec<LegacyRecord>>,
    reviewed: Option<Vec<LegacyRecord>>,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    link: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyLedgerFile {
    Current(LedgerFile),
    Legacy(LegacyLedgerFile),
}

/// Human-readable JSON ledger, replaced atomically on every persist
pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(content: &str) -> serde_json::Result<SeenSet> {
        let file: AnyLedgerFile = serde_json::from_str(content)?;
        match file {
            AnyLedgerFile::Current(file) => Ok(file.seen.into_iter().collect()),
            AnyLedgerFile::Legacy(LegacyLedgerFile {
                featured: None,
                reviewed: None,
            }) => Err(serde::de::Error::custom(
                "ledger has neither `seen` nor `featured`/`reviewed`",
            )),
            AnyLedgerFile::Legacy(file) => Ok(file
                .featured
                .into_iter()
                .chain(file.reviewed)
                .flatten()
                .map(|record| article_id(&record.link, "", ""))
                .collect()),
        }
    }

    fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Ledger for JsonFileLedger {
    fn load(&self) -> SeenSet {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No ledger found, starting fresh");
            return SeenSet::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read ledger, treating as empty");
                return SeenSet::new();
            }
        };

        match Self::parse(&content) {
            Ok(seen) => {
                info!(path = %self.path.display(), count = seen.len(), "Loaded ledger");
                seen
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ledger is corrupt, treating as empty");
                SeenSet::new()
            }
        }
    }

    fn persist(&self, seen: &SeenSet) -> Result<()> {
        let file = LedgerFile {
            version: LEDGER_VERSION.to_string(),
            updated_at: Utc::now().to_rfc3339(),
            seen: seen.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        // Write atomically using temp file
        let temp_path = self.temp_path();
        let written = Self::write_synced(&temp_path, json.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }
}

/// In-process ledger; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: Mutex<SeenSet>,
}

impl MemoryLedger {
    pub fn new(seen: SeenSet) -> Self {
        Self {
            seen: Mutex::new(seen),
        }
    }

    pub fn snapshot(&self) -> SeenSet {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Ledger for MemoryLedger {
    fn load(&self) -> SeenSet {
        self.snapshot()
    }

    fn persist(&self, seen: &SeenSet) -> Result<()> {
        if let Ok(mut stored) = self.seen.lock() {
            *stored = seen.clone();
        }
        Ok(())
    }
}
