//! Incoming error events
//!
//! An [`ErrorEvent`] is the transient input of the pipeline. It is owned by
//! the caller that captured the error and is never persisted in raw form:
//! the trace and context pass through the sanitizer first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form context attached to an error by the caller
pub type ErrorContext = serde_json::Map<String, serde_json::Value>;

/// A runtime error captured by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Fully qualified exception type name
    pub exception_type: String,
    /// Exception message as raised
    pub message: String,
    /// Source file where the error was raised
    pub file: String,
    /// Source line where the error was raised
    pub line: u32,
    /// Raw stack trace
    pub trace: String,
    /// Caller-supplied context (environment, url, user_id, ...)
    pub context: ErrorContext,
    /// When the error was captured
    pub occurred_at: DateTime<Utc>,
}

impl ErrorEvent {
    /// Creates an event captured now with an empty trace and context
    pub fn new(
        exception_type: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            exception_type: exception_type.into(),
            message: message.into(),
            file: file.into(),
            line,
            trace: String::new(),
            context: ErrorContext::new(),
            occurred_at: Utc::now(),
        }
    }

    /// Sets the raw stack trace
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }

    /// Adds a single context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Overrides the capture timestamp
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// The `environment` context value, if the caller supplied one as a string
    pub fn environment(&self) -> Option<&str> {
        self.context.get("environment").and_then(|v| v.as_str())
    }

    /// Exception type without its namespace or module path
    pub fn short_type(&self) -> &str {
        short_type_name(&self.exception_type)
    }
}

/// Strips namespace separators (`\`, `::`, `.`) from a type name
pub fn short_type_name(name: &str) -> &str {
    let name = name.rsplit('\\').next().unwrap_or(name);
    let name = name.rsplit("::").next().unwrap_or(name);
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_fields() {
        let event = ErrorEvent::new("App\\Errors\\BoomError", "boom", "src/app.rs", 42)
            .with_trace("#0 main")
            .with_context("environment", "production")
            .with_context("user_id", 7);

        assert_eq!(event.line, 42);
        assert_eq!(event.trace, "#0 main");
        assert_eq!(event.environment(), Some("production"));
        assert_eq!(event.context.get("user_id"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn short_type_strips_namespaces() {
        assert_eq!(short_type_name("App\\Errors\\BoomError"), "BoomError");
        assert_eq!(short_type_name("std::io::Error"), "Error");
        assert_eq!(short_type_name("java.lang.NullPointerException"), "NullPointerException");
        assert_eq!(short_type_name("RuntimeException"), "RuntimeException");
    }

    #[test]
    fn environment_ignores_non_string_values() {
        let event = ErrorEvent::new("E", "m", "f", 1).with_context("environment", 3);
        assert_eq!(event.environment(), None);
    }
}
