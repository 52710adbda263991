//! Nginx access log parser (common and combined formats).

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use loglens_core::{Entry, Level, ParseError, Parser};

const TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

static ACCESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<addr>\S+) \S+ (?P<user>\S+) \[(?P<time>[^\]]+)\] "(?P<request>[^"]*)" (?P<status>\d{3}) (?P<bytes>\d+|-)(?: "(?P<referer>[^"]*)" "(?P<agent>[^"]*)")?"#,
    )
    .expect("nginx access regex is valid")
});

/// Parser for nginx access logs.
///
/// Severity is derived from the HTTP status: `5xx` is an error, `4xx` a
/// warning, everything else informational.
#[derive(Debug, Clone, Copy, Default)]
pub struct NginxParser;

impl NginxParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

/// Map an HTTP status code onto a level.
pub fn level_for_status(status: u16) -> Level {
    match status {
        500..=u16::MAX => Level::Error,
        400..=499 => Level::Warning,
        _ => Level::Info,
    }
}

impl Parser for NginxParser {
    fn name(&self) -> &str {
        "Nginx access log"
    }

    fn parser_type(&self) -> &str {
        "nginx"
    }

    fn can_parse(&self, line: &str) -> bool {
        ACCESS_LINE.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Entry, ParseError> {
        let caps = ACCESS_LINE
            .captures(line)
            .ok_or_else(|| ParseError::new("nginx", "line does not match access log format"))?;

        let time = &caps["time"];
        let timestamp = DateTime::parse_from_str(time, TIME_FORMAT)
            .map_err(|e| ParseError::new("nginx", format!("bad timestamp '{time}': {e}")))?
            .with_timezone(&Utc);

        let status: u16 = caps["status"]
            .parse()
            .map_err(|_| ParseError::new("nginx", "bad status code"))?;
        let request = &caps["request"];

        let mut entry = Entry::new(
            Some(timestamp),
            level_for_status(status),
            "access",
            request,
            line,
        )
        .with_field("remote_addr", &caps["addr"])
        .with_field("status", status.to_string())
        .with_field("bytes", &caps["bytes"])
        .with_label("status_class", format!("{}xx", status / 100));

        let mut parts = request.splitn(3, ' ');
        if let (Some(method), Some(path)) = (parts.next(), parts.next()) {
            entry = entry.with_field("method", method).with_field("path", path);
            if let Some(protocol) = parts.next() {
                entry = entry.with_field("protocol", protocol);
            }
            entry = entry.with_label("method", method);
        }

        if &caps["user"] != "-" {
            entry = entry.with_field("remote_user", &caps["user"]);
        }
        if let Some(referer) = caps.name("referer").filter(|m| m.as_str() != "-") {
            entry = entry.with_field("referer", referer.as_str());
        }
        if let Some(agent) = caps.name("agent") {
            entry = entry.with_field("user_agent", agent.as_str());
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"192.168.1.10 - alice [01/Jan/2024:10:15:32 +0000] "GET /api/orders?id=7 HTTP/1.1" 404 153 "https://shop.example/" "Mozilla/5.0""#;

    #[test]
    fn test_parse_combined_line() {
        let entry = NginxParser.parse(LINE).unwrap();

        assert_eq!(entry.level, Level::Warning);
        assert_eq!(entry.entry_type, "access");
        assert_eq!(entry.fields["method"], "GET");
        assert_eq!(entry.fields["path"], "/api/orders?id=7");
        assert_eq!(entry.fields["status"], "404");
        assert_eq!(entry.fields["remote_user"], "alice");
        assert_eq!(entry.fields["referer"], "https://shop.example/");
        assert_eq!(entry.labels["status_class"], "4xx");
        assert_eq!(
            entry.timestamp.unwrap().to_rfc3339(),
            "2024-01-01T10:15:32+00:00"
        );
    }

    #[test]
    fn test_parse_common_format_with_offset() {
        let line = r#"10.0.0.1 - - [15/Mar/2024:23:30:00 +0200] "POST /login HTTP/2.0" 500 -"#;
        let entry = NginxParser.parse(line).unwrap();

        assert_eq!(entry.level, Level::Error);
        assert_eq!(
            entry.timestamp.unwrap().to_rfc3339(),
            "2024-03-15T21:30:00+00:00"
        );
        assert!(!entry.fields.contains_key("remote_user"));
        assert!(!entry.fields.contains_key("user_agent"));
    }

    #[test]
    fn test_status_levels() {
        assert_eq!(level_for_status(200), Level::Info);
        assert_eq!(level_for_status(301), Level::Info);
        assert_eq!(level_for_status(404), Level::Warning);
        assert_eq!(level_for_status(503), Level::Error);
    }

    #[test]
    fn test_rejects_other_formats() {
        assert!(!NginxParser.can_parse(r#"{"level":"info"}"#));
        assert!(NginxParser.parse("2024-01-01 10:00:00 INFO started").is_err());
    }
}
