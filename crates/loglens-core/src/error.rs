//! Error types for analysis operations.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};
use thiserror::Error;

/// Errors that abort an entire analysis run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Pattern expansion produced no files.
    #[error("No files match: {}", patterns.join(", "))]
    NoFilesMatch { patterns: Vec<String> },

    /// A glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A date bound could not be parsed.
    #[error("Invalid date '{input}': expected RFC3339 or YYYY-MM-DD")]
    InvalidDate { input: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalyzeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Pipeline stage at which a single file failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileStage {
    /// Opening the file.
    Open,
    /// Resolving a parser (explicit type or auto-detection).
    Detect,
    /// Rewinding after the detection probe.
    Seek,
    /// Reading lines.
    Read,
    /// The worker processing the file died.
    Worker,
}

/// A failure confined to one file. The batch continues.
///
/// Serializes as its display string, `path: stage: cause`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {stage}: {cause}", path.display())]
pub struct FileError {
    /// File that failed.
    pub path: PathBuf,
    /// Where in the pipeline it failed.
    pub stage: FileStage,
    /// Human-readable cause.
    pub cause: String,
}

impl FileError {
    /// Create a new file error.
    pub fn new(path: impl Into<PathBuf>, stage: FileStage, cause: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage,
            cause: cause.into(),
        }
    }

    /// Create a file error from an I/O failure.
    pub fn io(path: impl Into<PathBuf>, stage: FileStage, source: &std::io::Error) -> Self {
        Self::new(path, stage, source.to_string())
    }
}

impl FromStr for FileError {
    type Err = String;

    /// Parse the `path: stage: cause` form. The path ends at the first
    /// `: <stage>: ` separator, so paths containing `": "` still round trip.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for (at, _) in s.match_indices(": ") {
            let Some((stage, cause)) = s[at + 2..].split_once(": ") else {
                break;
            };
            if let Ok(stage) = FileStage::from_str(stage) {
                return Ok(Self::new(&s[..at], stage, cause));
            }
        }
        Err(format!("not a file error: '{s}'"))
    }
}

impl Serialize for FileError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FileError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A line (or line group) that did not match a parser's grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{parser}: {message}")]
pub struct ParseError {
    /// Parser that rejected the input.
    pub parser: String,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(parser: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parser: parser.into(),
            message: message.into(),
        }
    }
}
