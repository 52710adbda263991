//! Concurrent batch analysis engine for loglens.
//!
//! # Overview
//!
//! `loglens-scan` takes a set of file patterns and turns them into a
//! [`Report`]. Key features:
//!
//! - **Pattern expansion** via globset, walking directories with jwalk
//! - **Bounded concurrency** through a tokio [`WorkerPool`]
//! - **Per-file isolation**: a file that cannot be opened or recognized is
//!   recorded in [`Report::errors`] and the batch continues
//! - **Cooperative cancellation** with a `CancellationToken`
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use loglens_scan::{AnalyzeConfig, Analyzer, Registry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(registry: Registry) -> Result<(), loglens_scan::AnalyzeError> {
//! let analyzer = Analyzer::new(AnalyzeConfig::default(), registry);
//! let report = analyzer
//!     .analyze(CancellationToken::new(), &["/var/log/nginx/*.log"])
//!     .await?;
//!
//! println!("Entries: {}", report.summary.total_entries);
//! println!("Failed files: {}", report.errors.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! # use loglens_scan::{AnalyzeConfig, Analyzer, Registry};
//! let analyzer = Analyzer::new(AnalyzeConfig::default(), Registry::new());
//! let mut progress_rx = analyzer.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{}/{} files", progress.files_finished(), progress.files_total);
//!     }
//! });
//! ```

mod analyzer;
mod discover;
mod pipeline;
pub mod pool;
mod progress;

pub use analyzer::Analyzer;
pub use discover::expand_patterns;
pub use pool::{PoolError, WorkerPool};
pub use progress::AnalyzeProgress;

// Re-export core types for convenience
pub use loglens_core::{
    AnalyzeConfig, AnalyzeError, DateFilter, DateRange, FileError, FileStage, FileStats,
    Registry, Report, Summary,
};
