//! Analysis configuration types.

use std::num::NonZeroUsize;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;
use crate::filter::DateFilter;

/// Configuration for an analysis run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AnalyzeConfig {
    /// Number of concurrent workers (0 = host parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Job queue capacity (0 = twice the worker count).
    #[builder(default = "0")]
    #[serde(default)]
    pub buffer_size: usize,

    /// Parser type to force for every file (None = auto-detect per file).
    #[builder(default)]
    #[serde(default)]
    pub parser_type: Option<String>,

    /// Date range applied to every entry.
    #[builder(default)]
    #[serde(default)]
    pub filter: DateFilter,

    /// Maximum accepted entries per file (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub limit: Option<u64>,
}

impl AnalyzeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let filter = self.filter.unwrap_or_default();
        let parser_type = self.parser_type.as_ref().and_then(Option::as_deref);
        check_settings(self.limit.flatten(), &filter, parser_type)
    }
}

impl AnalyzeConfig {
    /// Create a new config builder.
    pub fn builder() -> AnalyzeConfigBuilder {
        AnalyzeConfigBuilder::default()
    }

    /// Check a config that did not go through the builder, e.g. one read
    /// from a file.
    pub fn validate(&self) -> Result<(), AnalyzeError> {
        check_settings(self.limit, &self.filter, self.parser_type.as_deref())
            .map_err(|message| AnalyzeError::InvalidConfig { message })
    }

    /// Worker count with the auto-detect default applied.
    pub fn resolved_workers(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Queue capacity with the default applied.
    pub fn resolved_buffer_size(&self) -> usize {
        resolve_buffer_size(self.buffer_size, self.resolved_workers())
    }
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            buffer_size: 0,
            parser_type: None,
            filter: DateFilter::disabled(),
            limit: None,
        }
    }
}

fn check_settings(
    limit: Option<u64>,
    filter: &DateFilter,
    parser_type: Option<&str>,
) -> Result<(), String> {
    if limit == Some(0) {
        return Err("Limit must be greater than zero".to_string());
    }
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(format!("Date range is empty: {from} is after {to}"));
        }
    }
    if parser_type.is_some_and(|t| t.trim().is_empty()) {
        return Err("Parser type cannot be empty".to_string());
    }
    Ok(())
}

/// Resolve a worker count, mapping 0 to the host's available parallelism.
pub fn resolve_workers(workers: usize) -> usize {
    match workers {
        0 => std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1),
        n => n,
    }
}

/// Resolve a queue capacity, mapping 0 to twice the worker count.
pub fn resolve_buffer_size(buffer_size: usize, workers: usize) -> usize {
    match buffer_size {
        0 => workers.max(1) * 2,
        n => n,
    }
}
