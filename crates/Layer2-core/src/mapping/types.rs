//! Mapping types - 엔트리, 상태, 작업 결과, 이벤트

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use vai_foundation::ContentHash;

// ============================================================================
// MappingEntry
// ============================================================================

/// Cached synopsis of one tracked file
///
/// Serialized field names are the on-disk format of `class_mappings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Canonical absolute path (identity key)
    pub path: PathBuf,

    /// Fingerprint of the content as last observed by the cache
    #[serde(rename = "md5sum", default)]
    pub content_hash: ContentHash,

    /// Cached synopsis, empty until a regeneration commits
    #[serde(rename = "mapping", default)]
    pub synopsis: String,

    /// `content_hash` at the time `synopsis` was produced
    #[serde(rename = "lastMappingMd5sum", default)]
    pub summarized_hash: ContentHash,
}

impl MappingEntry {
    /// Newly tracked file with no synopsis yet
    pub fn new(path: impl Into<PathBuf>, content_hash: ContentHash) -> Self {
        Self {
            path: path.into(),
            content_hash,
            synopsis: String::new(),
            summarized_hash: ContentHash::empty(),
        }
    }

    /// Synopsis exists and was produced from the current content
    pub fn is_up_to_date(&self) -> bool {
        !self.synopsis.is_empty() && self.summarized_hash == self.content_hash
    }

    pub fn status(&self) -> MappingStatus {
        if self.synopsis.is_empty() {
            MappingStatus::Unmapped
        } else if self.summarized_hash == self.content_hash {
            MappingStatus::Fresh
        } else {
            MappingStatus::Stale
        }
    }
}

// ============================================================================
// MappingStatus
// ============================================================================

/// Freshness of an entry, evaluated from its stored fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    /// No synopsis has ever been committed
    Unmapped,
    /// A synopsis exists but the content changed since
    Stale,
    /// Synopsis matches the current content
    Fresh,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unmapped => "unmapped",
            Self::Stale => "stale",
            Self::Fresh => "fresh",
        }
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Entry counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub unmapped: usize,
}

impl MappingStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a MappingEntry>) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            stats.total += 1;
            match entry.status() {
                MappingStatus::Fresh => stats.fresh += 1,
                MappingStatus::Stale => stats.stale += 1,
                MappingStatus::Unmapped => stats.unmapped += 1,
            }
        }
        stats
    }

    /// Entries that a refresh would regenerate
    pub fn outdated(&self) -> usize {
        self.stale + self.unmapped
    }
}

impl fmt::Display for MappingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tracked: {} fresh, {} stale, {} unmapped",
            self.total, self.fresh, self.stale, self.unmapped
        )
    }
}

// ============================================================================
// Refresh jobs
// ============================================================================

/// One regeneration request: the path and the fingerprint it was enqueued for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefreshJob {
    pub path: PathBuf,
    pub expected_hash: ContentHash,
}

/// How a regeneration job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Synopsis written to the store
    Committed,
    /// Summarized, but the entry's fingerprint moved on before commit
    Discarded,
    /// File content changed (or became unreadable) before the job started
    Superseded,
    /// Entry was removed before the job started
    Removed,
    /// Summarizer failed or produced nothing usable
    Failed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => f.write_str("committed"),
            Self::Discarded => f.write_str("discarded (stale result)"),
            Self::Superseded => f.write_str("superseded"),
            Self::Removed => f.write_str("removed"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Progress notifications published by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEvent {
    /// A worker picked up the job
    Started { path: PathBuf },
    /// The job finished
    Completed { path: PathBuf, outcome: JobOutcome },
}

/// Per-outcome counts of a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Files whose synopsis was already current (no job created)
    pub skipped: usize,
    pub committed: usize,
    pub discarded: usize,
    pub superseded: usize,
    pub removed: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Committed => self.committed += 1,
            JobOutcome::Discarded => self.discarded += 1,
            JobOutcome::Superseded => self.superseded += 1,
            JobOutcome::Removed => self.removed += 1,
            JobOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of jobs that actually ran
    pub fn jobs(&self) -> usize {
        self.committed + self.discarded + self.superseded + self.removed + self.failed
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed, {} failed, {} discarded, {} superseded, {} removed, {} already fresh",
            self.committed, self.failed, self.discarded, self.superseded, self.removed, self.skipped
        )
    }
}
