//! Multi-line application log parser.
//!
//! Handles the classic `2024-01-01 10:00:00.123 ERROR [worker-1] message`
//! layout where exceptions continue on the following lines:
//!
//! ```text
//! 2024-01-01 10:00:00 ERROR Payment failed
//! java.lang.IllegalStateException: card expired
//!     at com.shop.Payments.charge(Payments.java:42)
//! ```

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use loglens_core::{Entry, Level, MultiLineParser, ParseError, Parser};

static START_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<time>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:[.,]\d{1,9})?)\s+\[?(?P<level>TRACE|DEBUG|INFO|NOTICE|WARN|WARNING|ERROR|SEVERE|FATAL|CRITICAL)\]?\s+(?:\[(?P<thread>[^\]]+)\]\s+)?(?P<message>.*)$",
    )
    .expect("application log regex is valid")
});

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parser for application logs whose entries may carry stack traces.
///
/// Timestamps carry no zone and are read as UTC. An entry with continuation
/// lines is typed `exception`, otherwise `application`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppParser;

impl AppParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }

    fn parse_start(&self, line: &str) -> Result<Entry, ParseError> {
        let caps = START_LINE
            .captures(line)
            .ok_or_else(|| ParseError::new("app", "line does not start an entry"))?;

        let raw_time = caps["time"].replace(',', ".");
        let timestamp = TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw_time, fmt).ok())
            .ok_or_else(|| ParseError::new("app", format!("bad timestamp '{raw_time}'")))?
            .and_utc();

        let mut entry = Entry::new(
            Some(timestamp),
            Level::parse_loose(&caps["level"]),
            "application",
            &caps["message"],
            line,
        );
        if let Some(thread) = caps.name("thread") {
            entry = entry.with_field("thread", thread.as_str());
        }
        Ok(entry)
    }
}

impl Parser for AppParser {
    fn name(&self) -> &str {
        "Application log"
    }

    fn parser_type(&self) -> &str {
        "app"
    }

    fn can_parse(&self, line: &str) -> bool {
        START_LINE.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Entry, ParseError> {
        self.parse_start(line)
    }
}

impl MultiLineParser for AppParser {
    fn is_start_of_entry(&self, line: &str) -> bool {
        START_LINE.is_match(line)
    }

    fn parse_multi_line(&self, lines: &[String]) -> Result<Entry, ParseError> {
        let (first, rest) = lines
            .split_first()
            .ok_or_else(|| ParseError::new("app", "empty entry"))?;

        let mut entry = self.parse_start(first)?;
        if !rest.is_empty() {
            let trace = rest.join("\n");
            entry.entry_type = "exception".to_string();
            if let Some(exception) = rest.first().and_then(|l| exception_name(l)) {
                entry.labels.insert("exception".to_string(), exception);
            }
            entry.fields.insert("stack_trace".to_string(), trace);
            entry.raw = lines.join("\n");
        }
        Ok(entry)
    }
}

/// Pull `com.foo.BarException` out of `com.foo.BarException: message`.
fn exception_name(line: &str) -> Option<String> {
    let head = line.trim().split(':').next()?.trim();
    let looks_like_class = !head.is_empty()
        && !head.contains(' ')
        && (head.ends_with("Exception") || head.ends_with("Error"));
    looks_like_class.then(|| head.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_single_line_entry() {
        let entry = AppParser
            .parse("2024-01-01 10:00:00,250 WARN [main] cache miss ratio high")
            .unwrap();

        assert_eq!(entry.level, Level::Warning);
        assert_eq!(entry.entry_type, "application");
        assert_eq!(entry.message, "cache miss ratio high");
        assert_eq!(entry.fields["thread"], "main");
        assert_eq!(
            entry.timestamp.unwrap().to_rfc3339(),
            "2024-01-01T10:00:00.250+00:00"
        );
    }

    #[test]
    fn test_stack_trace_group() {
        let group = lines(
            "2024-01-01 10:00:00 ERROR Payment failed\n\
             java.lang.IllegalStateException: card expired\n    \
             at com.shop.Payments.charge(Payments.java:42)",
        );
        let entry = AppParser.parse_multi_line(&group).unwrap();

        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.entry_type, "exception");
        assert_eq!(entry.message, "Payment failed");
        assert_eq!(entry.labels["exception"], "java.lang.IllegalStateException");
        assert!(entry.fields["stack_trace"].contains("Payments.java:42"));
        assert_eq!(entry.raw.lines().count(), 3);
    }

    #[test]
    fn test_start_markers() {
        assert!(AppParser.is_start_of_entry("2024-01-01T10:00:00 INFO ready"));
        assert!(!AppParser.is_start_of_entry("    at com.shop.Main.run(Main.java:1)"));
        assert!(AppParser.parse_multi_line(&lines("  orphan continuation")).is_err());
        assert!(AppParser.parse_multi_line(&[]).is_err());
    }
}
