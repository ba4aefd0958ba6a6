//! PII sanitization for traces and context
//!
//! Runs upstream of every persistence and network call. Context is
//! projected onto a fixed allow-list; traces are masked pattern by pattern
//! and truncated last. Neither operation can fail.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::domain::ErrorContext;

/// Context keys that survive sanitization
pub const ALLOWED_CONTEXT_KEYS: &[&str] = &["environment", "timestamp", "url", "user_id"];

/// Default maximum trace length in characters
pub const MAX_TRACE_LENGTH: usize = 10_000;

/// Appended to a trace that was cut at the length limit
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

struct MaskRule {
    pattern: Regex,
    replacement: &'static str,
}

/// Masking rules in application order; specific labels before the generic hex rule
static MASK_RULES: Lazy<Vec<MaskRule>> = Lazy::new(|| {
    [
        (
            r"(?i)(Authorization\s*:\s*Bearer\s+)[A-Za-z0-9\-._~+/]+=*",
            "${1}[BEARER_TOKEN_MASKED]",
        ),
        (
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            "[EMAIL_MASKED]",
        ),
        (
            r"\beyJ[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b",
            "[JWT_MASKED]",
        ),
        (
            r"\b(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{8,}\b",
            "[API_KEY_MASKED]",
        ),
        (r"\bgh[pousr]_[A-Za-z0-9]{36,}\b", "[API_KEY_MASKED]"),
        (r"\bAKIA[0-9A-Z]{16}\b", "[API_KEY_MASKED]"),
        (r"\b[0-9a-fA-F]{32,}\b", "[TOKEN_MASKED]"),
        (
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            "[UUID_MASKED]",
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        Regex::new(pattern)
            .ok()
            .map(|pattern| MaskRule { pattern, replacement })
    })
    .collect()
});

/// Strips and masks sensitive data
#[derive(Debug, Clone)]
pub struct PiiSanitizer {
    max_trace_length: usize,
}

impl Default for PiiSanitizer {
    fn default() -> Self {
        Self {
            max_trace_length: MAX_TRACE_LENGTH,
        }
    }
}

impl PiiSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the trace length limit
    pub fn with_max_trace_length(mut self, max: usize) -> Self {
        self.max_trace_length = max;
        self
    }

    /// Projects `context` onto [`ALLOWED_CONTEXT_KEYS`]
    ///
    /// The `url` entry keeps only scheme, host, port and path. A non-string
    /// `url` is dropped.
    pub fn sanitize_context(&self, context: &ErrorContext) -> ErrorContext {
        let mut clean = ErrorContext::new();
        for key in ALLOWED_CONTEXT_KEYS {
            let Some(value) = context.get(*key) else {
                continue;
            };
            if *key == "url" {
                if let Value::String(raw) = value {
                    clean.insert((*key).to_string(), Value::String(strip_url(raw)));
                }
            } else {
                clean.insert((*key).to_string(), value.clone());
            }
        }
        clean
    }

    /// Masks secrets in `trace`, then truncates it
    pub fn sanitize_trace(&self, trace: &str) -> String {
        let mut masked = trace.to_string();
        for rule in MASK_RULES.iter() {
            masked = rule
                .pattern
                .replace_all(&masked, rule.replacement)
                .into_owned();
        }
        self.truncate(masked)
    }

    fn truncate(&self, trace: String) -> String {
        match trace.char_indices().nth(self.max_trace_length) {
            Some((cut, _)) => format!("{}{}", &trace[..cut], TRUNCATION_MARKER),
            None => trace,
        }
    }
}

/// Reduces a URL to `scheme://host[:port]/path`
fn strip_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = if trimmed.starts_with('/') {
        None
    } else {
        Url::parse(trimmed)
            .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
            .ok()
    };

    match parsed {
        Some(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {
            let host = url.host_str().unwrap_or_default();
            let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
            let path = if url.path().is_empty() { "/" } else { url.path() };
            format!("{}://{}{}{}", url.scheme(), host, port, path)
        }
        _ => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
