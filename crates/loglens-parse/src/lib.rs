//! Built-in log format parsers for loglens.
//!
//! Each parser implements [`loglens_core::Parser`]; formats whose entries
//! can span several lines also implement [`loglens_core::MultiLineParser`]
//! and are registered as such.
//!
//! | Type    | Format                                   | Mode        |
//! |---------|------------------------------------------|-------------|
//! | `app`   | `YYYY-MM-DD HH:MM:SS LEVEL msg` + traces | multi-line  |
//! | `json`  | one JSON object per line                 | single-line |
//! | `nginx` | nginx access log (common/combined)       | single-line |
//!
//! ```rust
//! use loglens_parse::default_registry;
//!
//! let registry = default_registry();
//! let kind = registry
//!     .detect(r#"127.0.0.1 - - [01/Jan/2024:00:00:00 +0000] "GET / HTTP/1.1" 200 12"#)
//!     .unwrap();
//! assert_eq!(kind.parser().parser_type(), "nginx");
//! ```

mod app;
mod json;
mod nginx;

pub use app::AppParser;
pub use json::JsonParser;
pub use nginx::{NginxParser, level_for_status};

use loglens_core::Registry;

/// A registry holding every built-in parser.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_multi_line(AppParser::new())
        .register(JsonParser::new())
        .register(NginxParser::new());
    registry
}
