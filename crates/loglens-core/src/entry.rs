//! Parsed log entry and severity types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Normalized severity of a log entry, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    #[default]
    Unknown,
}

impl Level {
    /// Map a vendor-specific level spelling onto a normalized level.
    ///
    /// Unrecognized spellings become [`Level::Unknown`].
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "dbg" | "verbose" => Level::Debug,
            "info" | "information" | "notice" => Level::Info,
            "warn" | "warning" => Level::Warning,
            "error" | "err" | "severe" => Level::Error,
            "fatal" | "critical" | "crit" | "panic" | "emerg" | "emergency" | "alert" => {
                Level::Fatal
            }
            _ => Level::Unknown,
        }
    }

    /// Whether entries at this level count towards the error total.
    pub fn is_error(self) -> bool {
        matches!(self, Level::Error | Level::Fatal)
    }

    /// Lowercase name, as used in count maps and CSV output.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A single parsed log record.
///
/// Produced by a parser and consumed by the analysis pipeline and the
/// exporters. Parsers leave `source` and `line` unset. The batch analyzer
/// only counts entries and does not fill them either; they carry location
/// for callers that build entries for export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// When the event happened. `None` if the line carried no timestamp.
    pub timestamp: Option<DateTime<Utc>>,

    /// Normalized severity.
    pub level: Level,

    /// Entry type, e.g. `access`, `application`, `exception`.
    #[serde(rename = "type")]
    pub entry_type: String,

    /// Human-readable message.
    pub message: String,

    /// Structured fields extracted by the parser.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,

    /// Low-cardinality labels suitable for grouping.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// The original text the entry was parsed from.
    pub raw: String,

    /// File the entry was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    /// 1-based line number where the entry starts (0 if unknown).
    #[serde(default)]
    pub line: u64,
}

impl Entry {
    /// Create an entry with the essentials set.
    pub fn new(
        timestamp: Option<DateTime<Utc>>,
        level: Level,
        entry_type: impl Into<String>,
        message: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            entry_type: entry_type.into(),
            message: message.into(),
            raw: raw.into(),
            ..Default::default()
        }
    }

    /// Add a field, builder style.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a label, builder style.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose() {
        assert_eq!(Level::parse_loose("WARN"), Level::Warning);
        assert_eq!(Level::parse_loose(" err "), Level::Error);
        assert_eq!(Level::parse_loose("CRITICAL"), Level::Fatal);
        assert_eq!(Level::parse_loose("notice"), Level::Info);
        assert_eq!(Level::parse_loose("shrug"), Level::Unknown);
    }

    #[test]
    fn test_level_is_error() {
        assert!(Level::Error.is_error());
        assert!(Level::Fatal.is_error());
        assert!(!Level::Warning.is_error());
        assert!(!Level::Unknown.is_error());
    }

    #[test]
    fn test_level_strings() {
        assert_eq!(Level::Warning.to_string(), "warning");
        assert_eq!(Level::Fatal.as_str(), "fatal");
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
    }

    #[test]
    fn test_entry_serializes_type_key() {
        let entry = Entry::new(None, Level::Info, "access", "GET /", "raw line")
            .with_field("status", "200");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["type"], "access");
        assert_eq!(json["level"], "info");
        assert_eq!(json["fields"]["status"], "200");
        assert!(json.get("labels").is_none());
    }
}
