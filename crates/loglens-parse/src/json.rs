//! JSON-lines parser for structured platform logs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use loglens_core::{Entry, Level, ParseError, Parser};

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "@timestamp", "time", "ts"];
const LEVEL_KEYS: &[&str] = &["level", "severity", "log_level"];
const TYPE_KEYS: &[&str] = &["type", "event"];
const MESSAGE_KEYS: &[&str] = &["message", "msg"];

/// Parser for one-JSON-object-per-line logs, as emitted by e-commerce
/// platforms and most structured loggers.
///
/// Well-known keys become entry attributes; every other scalar member is
/// kept as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl Parser for JsonParser {
    fn name(&self) -> &str {
        "JSON lines"
    }

    fn parser_type(&self) -> &str {
        "json"
    }

    fn can_parse(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with('{')
            && trimmed.ends_with('}')
            && serde_json::from_str::<Map<String, Value>>(trimmed).is_ok()
    }

    fn parse(&self, line: &str) -> Result<Entry, ParseError> {
        let object: Map<String, Value> = serde_json::from_str(line.trim())
            .map_err(|e| ParseError::new("json", e.to_string()))?;

        let timestamp = match pick(&object, TIMESTAMP_KEYS) {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        };
        let level = pick(&object, LEVEL_KEYS)
            .map(|raw| Level::parse_loose(&raw))
            .unwrap_or_default();
        let entry_type = pick(&object, TYPE_KEYS).unwrap_or_else(|| "json".to_string());
        let message = pick(&object, MESSAGE_KEYS).unwrap_or_default();

        let mut entry = Entry::new(timestamp, level, entry_type, message, line);
        for (key, value) in &object {
            let known = [TIMESTAMP_KEYS, LEVEL_KEYS, TYPE_KEYS, MESSAGE_KEYS]
                .iter()
                .any(|keys| keys.contains(&key.as_str()));
            if known {
                continue;
            }
            if let Some(text) = scalar(value) {
                entry.fields.insert(key.clone(), text);
            }
        }
        if let Some(service) = entry.fields.get("service").cloned() {
            entry.labels.insert("service".to_string(), service);
        }

        Ok(entry)
    }
}

fn pick(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .and_then(scalar)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// RFC3339 strings or Unix epoch seconds (integer or fractional).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| {
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9) as u32;
            DateTime::from_timestamp(whole, nanos)
        })
        .ok_or_else(|| ParseError::new("json", format!("bad timestamp '{raw}'")))
}
