//! Batch analyzer: expands patterns, fans files out to a worker pool and
//! assembles the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use loglens_analyze::Aggregator;
use loglens_core::{
    AnalyzeConfig, AnalyzeError, DateRange, FileError, FileStage, FileStats, Registry, Report,
};

use crate::discover::expand_patterns;
use crate::pipeline::FilePipeline;
use crate::pool::WorkerPool;
use crate::progress::{AnalyzeProgress, ProgressTracker};

/// Analyzes batches of log files concurrently.
pub struct Analyzer {
    config: AnalyzeConfig,
    registry: Arc<Registry>,
    progress_tx: broadcast::Sender<AnalyzeProgress>,
}

impl Analyzer {
    /// Create an analyzer over an explicit parser registry.
    pub fn new(config: AnalyzeConfig, registry: impl Into<Arc<Registry>>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            registry: registry.into(),
            progress_tx,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &AnalyzeConfig {
        &self.config
    }

    /// The parser registry in use.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Subscribe to progress updates, one per finished file.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalyzeProgress> {
        self.progress_tx.subscribe()
    }

    /// Expand `patterns` and analyze every matching file.
    ///
    /// Per-file failures are collected in [`Report::errors`]; only an invalid
    /// config, an empty expansion or an invalid pattern fails the whole run. Cancelling stops
    /// submission and in-flight scans, and the report covers whatever was
    /// finished.
    pub async fn analyze<S: AsRef<str>>(
        &self,
        cancel: CancellationToken,
        patterns: &[S],
    ) -> Result<Report, AnalyzeError> {
        self.config.validate()?;
        let files = expand_patterns(patterns)?;
        if files.is_empty() {
            return Err(AnalyzeError::NoFilesMatch {
                patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            });
        }
        self.analyze_files(cancel, files).await
    }

    /// Analyze an already expanded list of files.
    pub async fn analyze_files(
        &self,
        cancel: CancellationToken,
        files: Vec<PathBuf>,
    ) -> Result<Report, AnalyzeError> {
        self.config.validate()?;
        if files.is_empty() {
            return Err(AnalyzeError::NoFilesMatch { patterns: Vec::new() });
        }

        let started_at = Utc::now();
        let start = Instant::now();

        let pipeline = Arc::new(FilePipeline::new(
            self.registry.clone(),
            self.config.parser_type.clone(),
            self.config.filter,
            self.config.limit,
        ));

        let mut pool: WorkerPool<PathBuf, FileStats, FileError> =
            WorkerPool::new(self.config.workers, self.config.buffer_size);
        tracing::info!(files = files.len(), workers = pool.workers(), "starting analysis");

        let collector = tokio::spawn(collect(
            pool.take_results(),
            pool.take_errors(),
            ProgressTracker::new(files.len() as u64),
            self.progress_tx.clone(),
        ));

        pool.start(cancel.clone(), move |cancel, path: PathBuf| {
            let pipeline = pipeline.clone();
            async move {
                let job_path = path.clone();
                tokio::task::spawn_blocking(move || pipeline.run(&path, &cancel))
                    .await
                    .unwrap_or_else(|e| Err(FileError::new(job_path, FileStage::Worker, e.to_string())))
            }
        });

        for path in files {
            if let Err(e) = pool.submit(&cancel, path).await {
                tracing::warn!(error = %e, "stopped submitting files");
                break;
            }
        }
        pool.close().await;

        let (files, errors) = match collector.await {
            Ok(collected) => collected,
            Err(e) => {
                tracing::error!(error = %e, "result collector failed");
                (Vec::new(), Vec::new())
            }
        };

        let duration = start.elapsed();
        let summary = Aggregator::new().aggregate(&files, duration);
        let date_range = DateRange::from_files(&self.config.filter, &files);

        tracing::info!(
            files = summary.total_files,
            failed = errors.len(),
            entries = summary.total_entries,
            elapsed_ms = duration.as_millis() as u64,
            cancelled = cancel.is_cancelled(),
            "analysis finished"
        );

        Ok(Report {
            started_at,
            finished_at: Utc::now(),
            duration,
            files,
            summary,
            errors,
            date_range,
        })
    }
}

/// Drain both pool outputs until they close, publishing progress as files
/// finish. The collector owns the accumulated vectors outright.
async fn collect(
    results: Option<mpsc::Receiver<FileStats>>,
    errors: Option<mpsc::Receiver<FileError>>,
    mut tracker: ProgressTracker,
    progress_tx: broadcast::Sender<AnalyzeProgress>,
) -> (Vec<FileStats>, Vec<FileError>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    let (Some(mut results), Some(mut errors)) = (results, errors) else {
        return (files, failures);
    };
    let mut results_open = true;
    let mut errors_open = true;

    while results_open || errors_open {
        tokio::select! {
            stats = results.recv(), if results_open => match stats {
                Some(stats) => {
                    tracker.record_file(&stats);
                    files.push(stats);
                }
                None => {
                    results_open = false;
                    continue;
                }
            },
            error = errors.recv(), if errors_open => match error {
                Some(error) => {
                    tracing::warn!(%error, "file failed");
                    tracker.record_failure(&error);
                    failures.push(error);
                }
                None => {
                    errors_open = false;
                    continue;
                }
            },
        }
        let _ = progress_tx.send(tracker.snapshot());
    }

    (files, failures)
}
