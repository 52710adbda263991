//! Parser contracts and the parser registry.
//!
//! Parsers come in two shapes. Single-line parsers turn one physical line
//! into one [`Entry`]. Multi-line parsers additionally know where a logical
//! entry starts, so the analyzer can group continuation lines (stack traces,
//! wrapped messages) with the line that opened them.
//!
//! The shape is fixed when a parser is registered and carried as a
//! [`ParserKind`], so the hot scan loop dispatches on an enum instead of
//! probing capabilities per line.

use std::fmt;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::ParseError;

/// Turns raw log text into entries.
pub trait Parser: Send + Sync {
    /// Human-readable parser name.
    fn name(&self) -> &str;

    /// Short type identifier used for explicit selection (e.g. `nginx`).
    fn parser_type(&self) -> &str;

    /// Cheap probe used for auto-detection against a sample line.
    fn can_parse(&self, line: &str) -> bool;

    /// Parse a single line.
    fn parse(&self, line: &str) -> Result<Entry, ParseError>;
}

/// Framing capability for formats whose entries span several lines.
pub trait MultiLineParser: Send + Sync {
    /// Whether this line opens a new logical entry.
    fn is_start_of_entry(&self, line: &str) -> bool;

    /// Parse a group of lines that together form one entry.
    ///
    /// The first line is the one that satisfied [`is_start_of_entry`].
    ///
    /// [`is_start_of_entry`]: MultiLineParser::is_start_of_entry
    fn parse_multi_line(&self, lines: &[String]) -> Result<Entry, ParseError>;
}

/// A parser resolved to its dispatch mode.
#[derive(Clone)]
pub enum ParserKind {
    /// Every non-empty line is an entry.
    SingleLine(Arc<dyn Parser>),
    /// Lines are grouped between start-of-entry markers.
    MultiLine {
        parser: Arc<dyn Parser>,
        framing: Arc<dyn MultiLineParser>,
    },
}

impl ParserKind {
    /// Wrap a single-line parser.
    pub fn single_line<P: Parser + 'static>(parser: P) -> Self {
        Self::SingleLine(Arc::new(parser))
    }

    /// Wrap a parser that also provides multi-line framing.
    pub fn multi_line<P: Parser + MultiLineParser + 'static>(parser: P) -> Self {
        let parser = Arc::new(parser);
        Self::MultiLine {
            parser: parser.clone(),
            framing: parser,
        }
    }

    /// The underlying parser, regardless of mode.
    pub fn parser(&self) -> &dyn Parser {
        match self {
            Self::SingleLine(parser) => parser.as_ref(),
            Self::MultiLine { parser, .. } => parser.as_ref(),
        }
    }

    /// Whether entries may span several lines.
    pub fn is_multi_line(&self) -> bool {
        matches!(self, Self::MultiLine { .. })
    }
}

impl fmt::Debug for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_multi_line() { "MultiLine" } else { "SingleLine" };
        f.debug_struct(mode)
            .field("type", &self.parser().parser_type())
            .finish()
    }
}

/// An explicitly constructed set of parsers.
///
/// Auto-detection tries parsers in registration order, so register the most
/// specific formats first.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    parsers: Vec<ParserKind>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolved parser. A parser with the same type replaces the
    /// earlier registration in place.
    pub fn register_kind(&mut self, kind: ParserKind) -> &mut Self {
        let parser_type = kind.parser().parser_type().to_string();
        match self
            .parsers
            .iter_mut()
            .find(|k| k.parser().parser_type() == parser_type)
        {
            Some(existing) => *existing = kind,
            None => self.parsers.push(kind),
        }
        self
    }

    /// Register a single-line parser.
    pub fn register<P: Parser + 'static>(&mut self, parser: P) -> &mut Self {
        self.register_kind(ParserKind::single_line(parser))
    }

    /// Register a multi-line parser.
    pub fn register_multi_line<P: Parser + MultiLineParser + 'static>(
        &mut self,
        parser: P,
    ) -> &mut Self {
        self.register_kind(ParserKind::multi_line(parser))
    }

    /// Look up a parser by type identifier (case-insensitive).
    pub fn get(&self, parser_type: &str) -> Option<&ParserKind> {
        self.parsers
            .iter()
            .find(|k| k.parser().parser_type().eq_ignore_ascii_case(parser_type))
    }

    /// Find the first parser whose probe accepts `sample`.
    pub fn detect(&self, sample: &str) -> Option<&ParserKind> {
        self.parsers.iter().find(|k| k.parser().can_parse(sample))
    }

    /// Registered type identifiers, in registration order.
    pub fn types(&self) -> Vec<&str> {
        self.parsers.iter().map(|k| k.parser().parser_type()).collect()
    }

    /// Iterate over registered parsers.
    pub fn iter(&self) -> impl Iterator<Item = &ParserKind> {
        self.parsers.iter()
    }

    /// Number of registered parsers.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Check if no parsers are registered.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Level;

    struct Prefix(&'static str);

    impl Parser for Prefix {
        fn name(&self) -> &str {
            "prefix"
        }

        fn parser_type(&self) -> &str {
            self.0
        }

        fn can_parse(&self, line: &str) -> bool {
            line.starts_with(self.0)
        }

        fn parse(&self, line: &str) -> Result<Entry, ParseError> {
            if self.can_parse(line) {
                Ok(Entry::new(None, Level::Info, self.0, line, line))
            } else {
                Err(ParseError::new(self.0, "missing prefix"))
            }
        }
    }

    impl MultiLineParser for Prefix {
        fn is_start_of_entry(&self, line: &str) -> bool {
            self.can_parse(line)
        }

        fn parse_multi_line(&self, lines: &[String]) -> Result<Entry, ParseError> {
            self.parse(&lines.join("\n"))
        }
    }

    #[test]
    fn test_detect_uses_registration_order() {
        let mut registry = Registry::new();
        registry.register(Prefix("ab")).register(Prefix("a"));

        let kind = registry.detect("abc").unwrap();
        assert_eq!(kind.parser().parser_type(), "ab");
        assert_eq!(registry.detect("axe").unwrap().parser().parser_type(), "a");
        assert!(registry.detect("zzz").is_none());
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.register(Prefix("nginx"));

        assert!(registry.get("NGINX").is_some());
        assert!(registry.get("apache").is_none());
    }

    #[test]
    fn test_kind_is_fixed_at_registration() {
        let mut registry = Registry::new();
        registry.register(Prefix("one")).register_multi_line(Prefix("two"));

        assert!(!registry.get("one").unwrap().is_multi_line());
        assert!(registry.get("two").unwrap().is_multi_line());
        assert_eq!(registry.types(), vec!["one", "two"]);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = Registry::new();
        registry.register(Prefix("x")).register_multi_line(Prefix("x"));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("x").unwrap().is_multi_line());
    }
}
