//! Analysis progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use loglens_core::{FileError, FileStats};

/// Progress information during an analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeProgress {
    /// Files queued for analysis.
    pub files_total: u64,
    /// Files that produced statistics so far.
    pub files_done: u64,
    /// Files that failed so far.
    pub files_failed: u64,
    /// Accepted entries so far.
    pub entries_parsed: u64,
    /// Bytes read so far.
    pub bytes_read: u64,
    /// Most recently finished file.
    pub current_path: PathBuf,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl AnalyzeProgress {
    /// Files finished either way.
    pub fn files_finished(&self) -> u64 {
        self.files_done + self.files_failed
    }

    /// Completed share of queued files, between 0 and 1.
    pub fn fraction(&self) -> f64 {
        if self.files_total == 0 {
            0.0
        } else {
            self.files_finished() as f64 / self.files_total as f64
        }
    }

    /// Calculate throughput in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries_parsed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Running counters owned by the result collector.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    progress: AnalyzeProgress,
}

impl ProgressTracker {
    pub fn new(files_total: u64) -> Self {
        Self {
            start_time: Instant::now(),
            progress: AnalyzeProgress {
                files_total,
                ..Default::default()
            },
        }
    }

    pub fn record_file(&mut self, stats: &FileStats) {
        self.progress.files_done += 1;
        self.progress.entries_parsed += stats.parsed_count;
        self.progress.bytes_read += stats.bytes_read;
        self.progress.current_path.clone_from(&stats.path);
    }

    pub fn record_failure(&mut self, error: &FileError) {
        self.progress.files_failed += 1;
        self.progress.current_path.clone_from(&error.path);
    }

    pub fn snapshot(&self) -> AnalyzeProgress {
        AnalyzeProgress {
            elapsed: self.start_time.elapsed(),
            ..self.progress.clone()
        }
    }
}
