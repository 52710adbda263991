//! Per-file statistics, cross-file summary and the analysis report.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{Entry, Level};
use crate::error::FileError;
use crate::filter::DateFilter;

/// Counters for a single input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// File path.
    pub path: PathBuf,
    /// Parser type used for this file.
    pub parser: String,
    /// Bytes consumed by the scan.
    pub bytes_read: u64,
    /// Entries that parsed and passed the date filter.
    pub parsed_count: u64,
    /// Accepted entries at error or fatal level.
    pub error_count: u64,
    /// Lines (or line groups) that failed to parse.
    pub parse_errors: u64,
    /// Accepted entries per level.
    pub level_counts: BTreeMap<Level, u64>,
    /// Accepted entries per entry type.
    pub type_counts: BTreeMap<String, u64>,
    /// Earliest accepted timestamp.
    pub first_entry: Option<DateTime<Utc>>,
    /// Latest accepted timestamp.
    pub last_entry: Option<DateTime<Utc>>,
    /// Time spent scanning the file.
    pub parse_time: Duration,
}

impl FileStats {
    /// Create empty stats for a file.
    pub fn new(path: impl Into<PathBuf>, parser: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            parser: parser.into(),
            ..Default::default()
        }
    }

    /// Record an entry that passed the date filter.
    pub fn record_entry(&mut self, entry: &Entry) {
        self.parsed_count += 1;
        *self.level_counts.entry(entry.level).or_default() += 1;
        *self.type_counts.entry(entry.entry_type.clone()).or_default() += 1;

        if entry.level.is_error() {
            self.error_count += 1;
        }

        if let Some(ts) = entry.timestamp {
            if self.first_entry.is_none_or(|first| ts < first) {
                self.first_entry = Some(ts);
            }
            if self.last_entry.is_none_or(|last| ts > last) {
                self.last_entry = Some(ts);
            }
        }
    }

    /// Record a line that failed to parse.
    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    /// Count for a level, zero if absent.
    pub fn level_count(&self, level: Level) -> u64 {
        self.level_counts.get(&level).copied().unwrap_or(0)
    }
}

/// Aggregate counters across all files of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Files that produced statistics.
    pub total_files: u64,
    /// Accepted entries across all files.
    pub total_entries: u64,
    /// Accepted error/fatal entries across all files.
    pub total_errors: u64,
    /// Parse failures across all files.
    pub parse_errors: u64,
    /// Accepted entries per level.
    pub level_counts: BTreeMap<Level, u64>,
    /// Accepted entries per type.
    pub type_counts: BTreeMap<String, u64>,
    /// Throughput over the run's wall time.
    pub entries_per_sec: f64,
}

impl Summary {
    /// Share of entries at `level`, in percent. Zero when there are no entries.
    pub fn level_percentage(&self, level: Level) -> f64 {
        self.percentage(self.level_counts.get(&level).copied().unwrap_or(0))
    }

    /// Share of entries of `entry_type`, in percent. Zero when there are no entries.
    pub fn type_percentage(&self, entry_type: &str) -> f64 {
        self.percentage(self.type_counts.get(entry_type).copied().unwrap_or(0))
    }

    /// Share of error/fatal entries, in percent.
    pub fn error_rate(&self) -> f64 {
        self.percentage(self.total_errors)
    }

    fn percentage(&self, count: u64) -> f64 {
        if self.total_entries == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.total_entries as f64
        }
    }
}

/// Requested filter bounds plus the observed span of accepted entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Requested lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Requested upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Earliest accepted timestamp across all files.
    pub earliest: Option<DateTime<Utc>>,
    /// Latest accepted timestamp across all files.
    pub latest: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Build a range from the requested filter and per-file observations.
    /// Unset bounds and an empty span stay `None`.
    pub fn from_files(filter: &DateFilter, files: &[FileStats]) -> Self {
        Self {
            from: filter.from,
            to: filter.to,
            earliest: files.iter().filter_map(|f| f.first_entry).min(),
            latest: files.iter().filter_map(|f| f.last_entry).max(),
        }
    }
}

/// Full result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Per-file statistics, in completion order.
    pub files: Vec<FileStats>,
    /// Cross-file totals.
    pub summary: Summary,
    /// Files that could not be analyzed, serialized as display strings.
    pub errors: Vec<FileError>,
    /// Requested and observed time span.
    pub date_range: DateRange,
}

impl Report {
    /// Check if any file failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// File failures rendered for display.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Total bytes read across all files.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes_read).sum()
    }
}
