//! Report and entry export (JSON and CSV).
//!
//! The CSV report layout is a stable, line-oriented format meant for diffing
//! and scripting. Sections appear in this order, separated by one blank line:
//!
//! ```text
//! # Summary
//! total_files,2
//! ...
//!
//! # Level Counts
//! level,count,percentage
//! ...
//!
//! # Type Counts
//! type,count,percentage
//! ...
//!
//! # File Details
//! path,parsed,errors,parse_errors,parse_time_ms
//! ...
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};

use loglens_core::{Entry, Report};

/// Header row for entry CSV output.
pub const ENTRY_CSV_HEADER: [&str; 6] = ["timestamp", "level", "type", "message", "source", "line"];

/// Header row of the `# File Details` section.
pub const FILE_DETAILS_HEADER: [&str; 5] =
    ["path", "parsed", "errors", "parse_errors", "parse_time_ms"];

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing to the sink failed.
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding failed.
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Serializes reports and entries to a writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter {
    format: ExportFormat,
}

impl Exporter {
    /// Create an exporter for `format`.
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    /// The configured format.
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Write a full report.
    pub fn export_report<W: Write>(&self, report: &Report, mut writer: W) -> Result<(), ExportError> {
        match self.format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, report)?;
                writer.write_all(b"\n")?;
            }
            ExportFormat::Csv => write_report_csv(report, &mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a finite slice of entries.
    pub fn export_entries<W: Write>(&self, entries: &[Entry], mut writer: W) -> Result<(), ExportError> {
        match self.format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, entries)?;
                writer.write_all(b"\n")?;
            }
            ExportFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut writer);
                csv.write_record(ENTRY_CSV_HEADER)?;
                for entry in entries {
                    csv.write_record(entry_row(entry))?;
                }
                csv.flush()?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Write entries as they arrive from a possibly unbounded source.
    ///
    /// Only the entry currently being written is held in memory, and the
    /// sink is flushed after each one. JSON output is framed as a top-level
    /// array by hand so that it stays valid however many entries arrive.
    /// Returns the number of entries written.
    pub async fn export_entries_stream<S, W>(&self, mut entries: S, mut writer: W) -> Result<u64, ExportError>
    where
        S: Stream<Item = Entry> + Unpin,
        W: Write,
    {
        let mut written: u64 = 0;

        match self.format {
            ExportFormat::Json => {
                writer.write_all(b"[")?;
                while let Some(entry) = entries.next().await {
                    let separator: &[u8] = if written == 0 { b"\n  " } else { b",\n  " };
                    writer.write_all(separator)?;
                    serde_json::to_writer(&mut writer, &entry)?;
                    writer.flush()?;
                    written += 1;
                }
                writer.write_all(b"\n]\n")?;
            }
            ExportFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut writer);
                csv.write_record(ENTRY_CSV_HEADER)?;
                csv.flush()?;
                while let Some(entry) = entries.next().await {
                    csv.write_record(entry_row(&entry))?;
                    csv.flush()?;
                    written += 1;
                }
            }
        }

        writer.flush()?;
        tracing::debug!(written, format = %self.format, "entry stream exported");
        Ok(written)
    }
}

fn entry_row(entry: &Entry) -> [String; 6] {
    [
        entry.timestamp.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
        entry.level.as_str().to_string(),
        entry.entry_type.clone(),
        entry.message.clone(),
        entry
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        entry.line.to_string(),
    ]
}

fn write_report_csv<W: Write>(report: &Report, writer: &mut W) -> Result<(), ExportError> {
    let summary = &report.summary;

    let summary_rows = vec![
        vec!["total_files".to_string(), summary.total_files.to_string()],
        vec!["total_entries".to_string(), summary.total_entries.to_string()],
        vec!["total_errors".to_string(), summary.total_errors.to_string()],
        vec!["parse_errors".to_string(), summary.parse_errors.to_string()],
        vec!["entries_per_sec".to_string(), format!("{:.2}", summary.entries_per_sec)],
        vec!["duration_ms".to_string(), report.duration.as_millis().to_string()],
    ];
    write_section(writer, "# Summary", None, summary_rows)?;
    writer.write_all(b"\n")?;

    let level_rows = summary
        .level_counts
        .iter()
        .map(|(level, count)| {
            vec![
                level.as_str().to_string(),
                count.to_string(),
                format!("{:.2}", summary.level_percentage(*level)),
            ]
        })
        .collect();
    write_section(writer, "# Level Counts", Some(&["level", "count", "percentage"]), level_rows)?;
    writer.write_all(b"\n")?;

    let type_rows = summary
        .type_counts
        .iter()
        .map(|(entry_type, count)| {
            vec![
                entry_type.clone(),
                count.to_string(),
                format!("{:.2}", summary.type_percentage(entry_type)),
            ]
        })
        .collect();
    write_section(writer, "# Type Counts", Some(&["type", "count", "percentage"]), type_rows)?;
    writer.write_all(b"\n")?;

    let file_rows = report
        .files
        .iter()
        .map(|file| {
            vec![
                file.path.display().to_string(),
                file.parsed_count.to_string(),
                file.error_count.to_string(),
                file.parse_errors.to_string(),
                file.parse_time.as_millis().to_string(),
            ]
        })
        .collect();
    write_section(writer, "# File Details", Some(&FILE_DETAILS_HEADER), file_rows)?;

    Ok(())
}

/// Write a titled section. Each section gets its own CSV writer so the
/// separating blank line can go straight to the sink.
fn write_section<W: Write>(
    writer: &mut W,
    title: &str,
    header: Option<&[&str]>,
    rows: Vec<Vec<String>>,
) -> Result<(), ExportError> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv.write_record([title])?;
    if let Some(header) = header {
        csv.write_record(header)?;
    }
    for row in rows {
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}
