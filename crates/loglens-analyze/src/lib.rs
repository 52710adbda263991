//! Aggregation and export for loglens reports.
//!
//! This crate turns per-file results into something a person or a script
//! can consume:
//!
//! - **Aggregation** - reduce [`FileStats`] into a cross-file [`Summary`]
//! - **Export** - render a [`Report`] or a sequence of [`Entry`] values as
//!   JSON or CSV, including a streaming variant for unbounded sources
//!
//! ```rust
//! use std::time::Duration;
//! use loglens_analyze::Aggregator;
//! use loglens_core::{FileStats, Level};
//!
//! let mut stats = FileStats::new("/var/log/nginx/access.log", "nginx");
//! stats.parsed_count = 2;
//! stats.level_counts.insert(Level::Info, 2);
//!
//! let summary = Aggregator::new().aggregate(&[stats], Duration::from_secs(1));
//! assert_eq!(summary.total_entries, 2);
//! assert_eq!(summary.level_percentage(Level::Info), 100.0);
//! ```

mod aggregate;
pub mod export;

pub use aggregate::Aggregator;
pub use export::{ExportError, ExportFormat, Exporter};

// Re-export core types
pub use loglens_core::{Entry, FileStats, Report, Summary};
