//! Step definitions
//!
//! `api` holds the request steps and resource-specific assertions,
//! `common` the context, data and response assertions shared by every
//! feature.

pub mod api;
pub mod common;

use std::sync::OnceLock;

use plumbline_common::Error;
use regex::Regex;
use serde_json::Value;
use tracing::{error, info};

/// Result type of every step
pub type StepResult = std::result::Result<(), Error>;

/// Parse a step argument as JSON, keeping it as a string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Log an assertion and turn a false condition into a step failure.
pub fn ensure(passed: bool, message: impl Into<String>) -> StepResult {
    let message = message.into();
    if passed {
        info!("✅ PASS: {}", message);
        Ok(())
    } else {
        error!("❌ FAIL: {}", message);
        Err(Error::Assertion(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("[1,2]"), json!([1, 2]));
        assert_eq!(parse_value(r#"{"a":true}"#), json!({"a": true}));
        assert_eq!(parse_value("hello world"), json!("hello world"));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("Sincere@april.biz"));
        assert!(is_valid_email("Eliseo@gardner.biz"));
        assert!(!is_valid_email("no-at-sign.biz"));
        assert!(!is_valid_email("two@@at.biz"));
        assert!(!is_valid_email("has space@x.io"));
        assert!(!is_valid_email("nodot@host"));
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "fine").is_ok());
        let err = ensure(false, "Post should have an id").unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: Post should have an id");
    }
}
