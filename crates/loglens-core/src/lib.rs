//! Core types and traits for loglens.
//!
//! This crate provides the fundamental data structures used throughout
//! the loglens ecosystem: parsed entries, per-file and cross-file
//! statistics, the date filter, configuration, and the parser contracts.

mod config;
mod entry;
mod error;
mod filter;
mod parser;
mod stats;

pub use config::{AnalyzeConfig, AnalyzeConfigBuilder, resolve_buffer_size, resolve_workers};
pub use entry::{Entry, Level};
pub use error::{AnalyzeError, FileError, FileStage, ParseError};
pub use filter::{Bound, DateFilter, parse_date_bound};
pub use parser::{MultiLineParser, Parser, ParserKind, Registry};
pub use stats::{DateRange, FileStats, Report, Summary};
