//! Per-file pipeline: open, resolve a parser, scan lines, count.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use loglens_core::{
    DateFilter, Entry, FileError, FileStage, FileStats, MultiLineParser, Parser, ParserKind,
    Registry,
};

/// Settings shared by every file of one run.
#[derive(Debug, Clone)]
pub(crate) struct FilePipeline {
    registry: Arc<Registry>,
    parser_type: Option<String>,
    filter: DateFilter,
    limit: Option<u64>,
}

impl FilePipeline {
    pub fn new(
        registry: Arc<Registry>,
        parser_type: Option<String>,
        filter: DateFilter,
        limit: Option<u64>,
    ) -> Self {
        Self {
            registry,
            parser_type,
            filter,
            limit,
        }
    }

    /// Analyze one file. Blocking; run it off the async executor.
    ///
    /// Cancellation is polled before every line. A cancelled scan returns
    /// the statistics gathered so far.
    pub fn run(&self, path: &Path, cancel: &CancellationToken) -> Result<FileStats, FileError> {
        let started = Instant::now();

        let file = File::open(path).map_err(|e| FileError::io(path, FileStage::Open, &e))?;
        let mut reader = BufReader::new(file);

        let sample = first_non_empty_line(&mut reader)
            .map_err(|e| FileError::io(path, FileStage::Read, &e))?
            .ok_or_else(|| FileError::new(path, FileStage::Detect, "empty file"))?;
        let kind = self.resolve(path, &sample)?;

        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| FileError::io(path, FileStage::Seek, &e))?;

        let mut scan = FileScan {
            stats: FileStats::new(path, kind.parser().parser_type()),
            filter: &self.filter,
            limit: self.limit,
        };
        let outcome = match kind {
            ParserKind::SingleLine(parser) => scan.single_line(parser.as_ref(), &mut reader, cancel),
            ParserKind::MultiLine { framing, .. } => scan.multi_line(framing.as_ref(), &mut reader, cancel),
        };
        outcome.map_err(|e| FileError::io(path, FileStage::Read, &e))?;

        let mut stats = scan.stats;
        stats.parse_time = started.elapsed();
        tracing::debug!(
            path = %path.display(),
            parser = %stats.parser,
            parsed = stats.parsed_count,
            parse_errors = stats.parse_errors,
            "file analyzed"
        );
        Ok(stats)
    }

    fn resolve(&self, path: &Path, sample: &str) -> Result<ParserKind, FileError> {
        let kind = match &self.parser_type {
            Some(parser_type) => self.registry.get(parser_type).ok_or_else(|| {
                FileError::new(path, FileStage::Detect, format!("unknown parser type '{parser_type}'"))
            })?,
            None => self.registry.detect(sample).ok_or_else(|| {
                FileError::new(path, FileStage::Detect, "no parser recognizes the first line")
            })?,
        };
        Ok(kind.clone())
    }
}

struct FileScan<'a> {
    stats: FileStats,
    filter: &'a DateFilter,
    limit: Option<u64>,
}

impl FileScan<'_> {
    fn single_line<R: BufRead>(
        &mut self,
        parser: &dyn Parser,
        reader: &mut R,
        cancel: &CancellationToken,
    ) -> io::Result<()> {
        let mut lines = LineReader::new(reader);
        while !cancel.is_cancelled() {
            let Some(line) = lines.next_line()? else {
                break;
            };
            self.stats.bytes_read += line.bytes;
            if line.text.trim().is_empty() {
                continue;
            }
            match parser.parse(&line.text) {
                Ok(entry) => {
                    if self.accept(&entry) {
                        break;
                    }
                }
                Err(_) => self.stats.record_parse_error(),
            }
        }
        Ok(())
    }

    fn multi_line<R: BufRead>(
        &mut self,
        framing: &dyn MultiLineParser,
        reader: &mut R,
        cancel: &CancellationToken,
    ) -> io::Result<()> {
        let mut lines = LineReader::new(reader);
        let mut group: Vec<String> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let Some(line) = lines.next_line()? else {
                break;
            };
            self.stats.bytes_read += line.bytes;
            if line.text.trim().is_empty() {
                continue;
            }
            if framing.is_start_of_entry(&line.text) && !group.is_empty() && self.flush(framing, &mut group) {
                return Ok(());
            }
            group.push(line.text);
        }

        if !group.is_empty() {
            self.flush(framing, &mut group);
        }
        Ok(())
    }

    /// Parse a buffered group. Returns true once the limit is reached.
    fn flush(&mut self, framing: &dyn MultiLineParser, group: &mut Vec<String>) -> bool {
        let lines = std::mem::take(group);
        match framing.parse_multi_line(&lines) {
            Ok(entry) => self.accept(&entry),
            Err(_) => {
                self.stats.record_parse_error();
                false
            }
        }
    }

    /// Count an entry if the filter keeps it. Returns true once the limit is
    /// reached.
    fn accept(&mut self, entry: &Entry) -> bool {
        if !self.filter.matches(entry) {
            return false;
        }
        self.stats.record_entry(entry);
        self.limit.is_some_and(|limit| self.stats.parsed_count >= limit)
    }
}

struct Line {
    text: String,
    bytes: u64,
}

/// Byte-oriented line reader that tolerates invalid UTF-8 and CRLF endings.
struct LineReader<'a, R> {
    reader: &'a mut R,
    buf: Vec<u8>,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
        }
    }

    fn next_line(&mut self) -> io::Result<Option<Line>> {
        self.buf.clear();
        let bytes = self.reader.read_until(b'\n', &mut self.buf)?;
        if bytes == 0 {
            return Ok(None);
        }
        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some(Line {
            text: String::from_utf8_lossy(&self.buf[..end]).into_owned(),
            bytes: bytes as u64,
        }))
    }
}

fn first_non_empty_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut lines = LineReader::new(reader);
    while let Some(line) = lines.next_line()? {
        if !line.text.trim().is_empty() {
            return Ok(Some(line.text));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use chrono::{DateTime, Utc};
    use loglens_core::{Level, ParseError};

    /// `LEVEL message`, with indented lines continuing the previous entry.
    struct Simple;

    impl Parser for Simple {
        fn name(&self) -> &str {
            "Simple"
        }

        fn parser_type(&self) -> &str {
            "simple"
        }

        fn can_parse(&self, line: &str) -> bool {
            line.split_once(' ')
                .is_some_and(|(level, _)| level.parse::<Level>().is_ok())
        }

        fn parse(&self, line: &str) -> Result<Entry, ParseError> {
            let (level, message) = line
                .split_once(' ')
                .ok_or_else(|| ParseError::new("simple", "no level"))?;
            let level = level
                .parse::<Level>()
                .map_err(|_| ParseError::new("simple", "bad level"))?;
            Ok(Entry::new(None, level, "simple", message, line))
        }
    }

    impl MultiLineParser for Simple {
        fn is_start_of_entry(&self, line: &str) -> bool {
            !line.starts_with(' ')
        }

        fn parse_multi_line(&self, lines: &[String]) -> Result<Entry, ParseError> {
            let entry = self.parse(&lines[0])?;
            let entry_type = if lines.len() > 1 { "grouped" } else { "simple" };
            Ok(Entry { entry_type: entry_type.into(), ..entry })
        }
    }

    /// `<epoch secs> message`, with indented lines continuing the previous entry.
    struct Stamped;

    impl Parser for Stamped {
        fn name(&self) -> &str {
            "Stamped"
        }

        fn parser_type(&self) -> &str {
            "stamped"
        }

        fn can_parse(&self, line: &str) -> bool {
            self.parse(line).is_ok()
        }

        fn parse(&self, line: &str) -> Result<Entry, ParseError> {
            let (secs, message) = line
                .split_once(' ')
                .ok_or_else(|| ParseError::new("stamped", "no timestamp"))?;
            let timestamp = secs
                .parse()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| ParseError::new("stamped", "bad timestamp"))?;
            Ok(Entry::new(Some(timestamp), Level::Info, "stamped", message, line))
        }
    }

    impl MultiLineParser for Stamped {
        fn is_start_of_entry(&self, line: &str) -> bool {
            !line.starts_with(' ')
        }

        fn parse_multi_line(&self, lines: &[String]) -> Result<Entry, ParseError> {
            self.parse(&lines[0])
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn scan(kind: &ParserKind, input: &str, limit: Option<u64>) -> FileStats {
        scan_filtered(kind, input, DateFilter::disabled(), limit)
    }

    fn scan_filtered(kind: &ParserKind, input: &str, filter: DateFilter, limit: Option<u64>) -> FileStats {
        let mut scan = FileScan {
            stats: FileStats::new("mem", "simple"),
            filter: &filter,
            limit,
        };
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let cancel = CancellationToken::new();
        match kind {
            ParserKind::SingleLine(p) => scan.single_line(p.as_ref(), &mut reader, &cancel),
            ParserKind::MultiLine { framing, .. } => scan.multi_line(framing.as_ref(), &mut reader, &cancel),
        }
        .unwrap();
        scan.stats
    }

    #[test]
    fn test_line_reader_handles_crlf_and_invalid_utf8() {
        let mut cursor = Cursor::new(b"one\r\ntw\xffo\nlast".to_vec());
        let mut lines = LineReader::new(&mut cursor);

        let first = lines.next_line().unwrap().unwrap();
        assert_eq!(first.text, "one");
        assert_eq!(first.bytes, 5);
        assert_eq!(lines.next_line().unwrap().unwrap().text, "tw\u{fffd}o");
        assert_eq!(lines.next_line().unwrap().unwrap().text, "last");
        assert!(lines.next_line().unwrap().is_none());
    }

    #[test]
    fn test_single_line_counts() {
        let kind = ParserKind::single_line(Simple);
        let stats = scan(&kind, "info up\n\nerror down\ngarbage\n", None);

        assert_eq!(stats.parsed_count, 2);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.bytes_read, 28);
    }

    #[test]
    fn test_multi_line_groups() {
        let kind = ParserKind::multi_line(Simple);
        let input = "error boom\n  at a\n  at b\ninfo fine\n\nwarning last\n";
        let stats = scan(&kind, input, None);

        assert_eq!(stats.parsed_count, 3);
        assert_eq!(stats.type_counts["grouped"], 1);
        assert_eq!(stats.type_counts["simple"], 2);
    }

    #[test]
    fn test_limit_applies_to_accepted_entries() {
        let single = ParserKind::single_line(Simple);
        let stats = scan(&single, "bad\ninfo a\nbad\ninfo b\ninfo c\n", Some(2));
        assert_eq!(stats.parsed_count, 2);
        assert_eq!(stats.parse_errors, 2);

        let multi = ParserKind::multi_line(Simple);
        let stats = scan(&multi, "info a\n  x\ninfo b\ninfo c\n", Some(2));
        assert_eq!(stats.parsed_count, 2);
    }

    #[test]
    fn test_limit_skips_filtered_groups() {
        let multi = ParserKind::multi_line(Stamped);
        let input = "1 a\n  trace\n2 b\n3 c\n  trace\n4 d\n5 e\n";
        let filter = DateFilter::new(Some(at(3)), None);

        let stats = scan_filtered(&multi, input, filter, Some(2));
        assert_eq!(stats.parsed_count, 2);
        assert_eq!(stats.parse_errors, 0);
        assert_eq!(stats.first_entry, Some(at(3)));
        assert_eq!(stats.last_entry, Some(at(4)));

        let single = ParserKind::single_line(Stamped);
        let stats = scan_filtered(&single, "1 a\n2 b\n3 c\n4 d\n5 e\n", filter, Some(2));
        assert_eq!(stats.parsed_count, 2);
        assert_eq!(stats.last_entry, Some(at(4)));
    }

    #[test]
    fn test_cancelled_scan_reads_nothing() {
        let filter = DateFilter::disabled();
        let mut scan = FileScan {
            stats: FileStats::new("mem", "simple"),
            filter: &filter,
            limit: None,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut reader = Cursor::new(b"info a\ninfo b\n".to_vec());
        scan.single_line(&Simple, &mut reader, &cancel).unwrap();

        assert_eq!(scan.stats.parsed_count, 0);
        assert_eq!(scan.stats.bytes_read, 0);
    }

    #[test]
    fn test_first_non_empty_line() {
        let mut reader = Cursor::new(b"\n  \r\nhello\nworld\n".to_vec());
        assert_eq!(first_non_empty_line(&mut reader).unwrap().as_deref(), Some("hello"));

        let mut empty = Cursor::new(b"\n\n".to_vec());
        assert_eq!(first_non_empty_line(&mut empty).unwrap(), None);
    }
}
