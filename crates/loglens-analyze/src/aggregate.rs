//! Cross-file aggregation.

use std::time::Duration;

use loglens_core::{FileStats, Summary};

/// Reduces per-file statistics into one [`Summary`].
///
/// Aggregation is a pure function of its inputs: the same slice and elapsed
/// time always give the same summary, regardless of file order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Sum `files` into a summary, computing throughput over `elapsed`.
    pub fn aggregate(&self, files: &[FileStats], elapsed: Duration) -> Summary {
        let mut summary = Summary {
            total_files: files.len() as u64,
            ..Default::default()
        };

        for file in files {
            summary.total_entries += file.parsed_count;
            summary.total_errors += file.error_count;
            summary.parse_errors += file.parse_errors;

            for (level, count) in &file.level_counts {
                *summary.level_counts.entry(*level).or_default() += count;
            }
            for (entry_type, count) in &file.type_counts {
                *summary.type_counts.entry(entry_type.clone()).or_default() += count;
            }
        }

        summary.entries_per_sec = entries_per_sec(summary.total_entries, elapsed);
        summary
    }
}

/// Throughput, defined as 0 when either side is 0.
fn entries_per_sec(total: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if total == 0 || secs <= 0.0 {
        0.0
    } else {
        total as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loglens_core::Level;

    fn stats(path: &str, levels: &[(Level, u64)], types: &[(&str, u64)], parse_errors: u64) -> FileStats {
        let mut stats = FileStats::new(path, "test");
        for (level, count) in levels {
            stats.level_counts.insert(*level, *count);
            stats.parsed_count += count;
            if level.is_error() {
                stats.error_count += count;
            }
        }
        for (entry_type, count) in types {
            stats.type_counts.insert(entry_type.to_string(), *count);
        }
        stats.parse_errors = parse_errors;
        stats
    }

    #[test]
    fn test_sums_per_key() {
        let files = vec![
            stats("a", &[(Level::Info, 3), (Level::Error, 1)], &[("access", 4)], 2),
            stats("b", &[(Level::Info, 1), (Level::Fatal, 2)], &[("exception", 2), ("access", 1)], 0),
            stats("c", &[], &[], 5),
        ];

        let summary = Aggregator.aggregate(&files, Duration::from_secs(2));

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_entries, 7);
        assert_eq!(summary.total_entries, files.iter().map(|f| f.parsed_count).sum::<u64>());
        assert_eq!(summary.total_errors, 3);
        assert_eq!(summary.parse_errors, 7);
        assert_eq!(summary.level_counts[&Level::Info], 4);
        assert_eq!(summary.level_counts[&Level::Fatal], 2);
        assert!(!summary.level_counts.contains_key(&Level::Warning));
        assert_eq!(summary.type_counts["access"], 5);
        assert_eq!(summary.entries_per_sec, 3.5);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let files = vec![stats("a", &[(Level::Info, 10)], &[], 0)];
        assert_eq!(Aggregator.aggregate(&files, Duration::ZERO).entries_per_sec, 0.0);

        let empty = Aggregator.aggregate(&[], Duration::from_secs(1));
        assert_eq!(empty.entries_per_sec, 0.0);
        assert_eq!(empty.total_files, 0);
        assert_eq!(empty.level_percentage(Level::Info), 0.0);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let a = stats("a", &[(Level::Warning, 2)], &[("access", 2)], 1);
        let b = stats("b", &[(Level::Debug, 5)], &[("json", 5)], 0);
        let elapsed = Duration::from_millis(250);

        let first = Aggregator.aggregate(&[a.clone(), b.clone()], elapsed);
        let second = Aggregator.aggregate(&[a.clone(), b.clone()], elapsed);
        let reversed = Aggregator.aggregate(&[b, a], elapsed);

        assert_eq!(first, second);
        assert_eq!(first, reversed);
    }

    #[test]
    fn test_percentages_bounded() {
        let files = vec![stats(
            "a",
            &[(Level::Info, 1), (Level::Warning, 1), (Level::Error, 1)],
            &[("access", 3)],
            0,
        )];
        let summary = Aggregator.aggregate(&files, Duration::from_secs(1));

        let total: f64 = summary
            .level_counts
            .keys()
            .map(|level| summary.level_percentage(*level))
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(summary.type_percentage("access"), 100.0);
    }
}
