//! loglens - A concurrent multi-format log analyzer.
//!
//! Usage:
//!   loglens analyze <PATTERNS>...   Analyze matching log files
//!   loglens parsers                 List built-in parsers
//!   loglens --help                  Show help

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use loglens_analyze::{ExportFormat, Exporter};
use loglens_core::{AnalyzeConfig, Bound, DateFilter, Report, parse_date_bound};
use loglens_parse::default_registry;
use loglens_scan::Analyzer;

#[derive(Parser)]
#[command(
    name = "loglens",
    version,
    about = "A concurrent multi-format log analyzer",
    long_about = "loglens parses nginx access logs, JSON event logs and multi-line \
                  application logs, then reports entry counts per level and type.\n\n\
                  Set RUST_LOG to override the log filter."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze log files matching glob patterns
    Analyze {
        /// Files or glob patterns (e.g. "/var/log/nginx/*.log", "logs/**/*.log")
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Force a parser type instead of auto-detecting per file
        #[arg(short = 't', long = "type")]
        parser_type: Option<String>,

        /// Only count entries at or after this time (RFC3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only count entries at or before this time (RFC3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Number of concurrent workers (0 = number of CPUs)
        #[arg(short, long, default_value = "0")]
        workers: usize,

        /// Stop each file after this many accepted entries
        #[arg(short, long)]
        limit: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in parsers
    Parsers,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze {
            patterns,
            parser_type,
            from,
            to,
            workers,
            limit,
            format,
            output,
        } => {
            let filter = DateFilter::new(
                from.as_deref()
                    .map(|s| parse_date_bound(s, Bound::From))
                    .transpose()
                    .context("Invalid --from")?,
                to.as_deref()
                    .map(|s| parse_date_bound(s, Bound::To))
                    .transpose()
                    .context("Invalid --to")?,
            );
            let config = AnalyzeConfig::builder()
                .workers(workers)
                .parser_type(parser_type)
                .filter(filter)
                .limit(limit)
                .build()
                .context("Invalid configuration")?;
            tracing::debug!(?config, "configuration resolved");

            run_analyze(config, &patterns, format, output).await?;
        }
        Command::Parsers => run_parsers(),
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Analyze files and write the report.
async fn run_analyze(
    config: AnalyzeConfig,
    patterns: &[String],
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let analyzer = Analyzer::new(config, default_registry());
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, finishing with partial results...");
            on_interrupt.cancel();
        }
    });

    if io::stderr().is_terminal() {
        let mut progress_rx = analyzer.subscribe();
        tokio::spawn(async move {
            while let Ok(progress) = progress_rx.recv().await {
                eprint!(
                    "\r Analyzed {}/{} files, {} entries",
                    progress.files_finished(),
                    progress.files_total,
                    progress.entries_parsed
                );
            }
            eprint!("\r{}\r", " ".repeat(60));
        });
    }

    eprintln!("Analyzing {}...", patterns.join(" "));
    let report = analyzer
        .analyze(cancel, patterns)
        .await
        .context("Analysis failed")?;
    drop(analyzer);

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Text => {
            write_text(&report, &mut writer)?;
            writer.flush()?;
        }
        OutputFormat::Json => Exporter::new(ExportFormat::Json).export_report(&report, &mut writer)?,
        OutputFormat::Csv => Exporter::new(ExportFormat::Csv).export_report(&report, &mut writer)?,
    }

    if let Some(path) = output {
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

/// List registered parsers.
fn run_parsers() {
    let registry = default_registry();
    println!(" {:<8} {:<12} {}", "TYPE", "MODE", "NAME");
    for kind in registry.iter() {
        let mode = if kind.is_multi_line() { "multi-line" } else { "single-line" };
        println!(" {:<8} {:<12} {}", kind.parser().parser_type(), mode, kind.parser().name());
    }
}

/// Render a human-readable report.
fn write_text(report: &Report, out: &mut impl Write) -> io::Result<()> {
    let summary = &report.summary;

    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out, " Log Analysis Report")?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(
        out,
        " {} files analyzed, {} failed, {} read",
        summary.total_files,
        report.errors.len(),
        format_size(report.total_bytes())
    )?;
    writeln!(
        out,
        " {} entries, {} errors ({:.1}%), {} parse errors",
        summary.total_entries,
        summary.total_errors,
        summary.error_rate(),
        summary.parse_errors
    )?;
    writeln!(
        out,
        " Finished in {:.2}s ({:.0} entries/s)",
        report.duration.as_secs_f64(),
        summary.entries_per_sec
    )?;
    let range = &report.date_range;
    if let (Some(earliest), Some(latest)) = (range.earliest, range.latest) {
        writeln!(out, " Time span: {earliest} .. {latest}")?;
    }
    if range.from.is_some() || range.to.is_some() {
        writeln!(
            out,
            " Filter: {} .. {}",
            range.from.map(|t| t.to_rfc3339()).unwrap_or_else(|| "*".into()),
            range.to.map(|t| t.to_rfc3339()).unwrap_or_else(|| "*".into())
        )?;
    }
    writeln!(out, "{}", "─".repeat(70))?;

    if !summary.level_counts.is_empty() {
        writeln!(out)?;
        writeln!(out, " Levels:")?;
        for (level, count) in summary.level_counts.iter().sorted_by(|a, b| b.1.cmp(a.1)) {
            let pct = summary.level_percentage(*level);
            writeln!(out, "   {:<10} {:>10} {:>6.1}% {}", level.as_str(), count, pct, make_bar(pct / 100.0, 20))?;
        }
    }

    if !summary.type_counts.is_empty() {
        writeln!(out)?;
        writeln!(out, " Types:")?;
        for (entry_type, count) in summary.type_counts.iter().sorted_by(|a, b| b.1.cmp(a.1)) {
            let pct = summary.type_percentage(entry_type);
            writeln!(out, "   {:<10} {:>10} {:>6.1}% {}", entry_type, count, pct, make_bar(pct / 100.0, 20))?;
        }
    }

    if !report.files.is_empty() {
        writeln!(out)?;
        writeln!(out, " Files:")?;
        for file in report.files.iter().sorted_by(|a, b| a.path.cmp(&b.path)) {
            writeln!(
                out,
                "   {:<40} {:<6} {:>8} entries {:>6} errors {:>6} unparsed {:>10}",
                truncate(&file.path.display().to_string(), 40),
                file.parser,
                file.parsed_count,
                file.error_count,
                file.parse_errors,
                format_size(file.bytes_read)
            )?;
        }
    }

    if report.has_errors() {
        writeln!(out)?;
        writeln!(out, " Failed files:")?;
        for message in report.error_messages() {
            writeln!(out, "   {message}")?;
        }
    }
    writeln!(out)?;

    Ok(())
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Keep the tail of a long path, which is usually the informative part.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 1)).collect();
        format!("…{tail}")
    }
}
