//! Rule-based issue titles
//!
//! Titles look like `[Error][HIGH] QueryException: connection refused`.
//! The prefix is fixed; the suffix is either the normalized exception
//! message or a suffix proposed by an `IIssueTitleGenerator`. Lengths are
//! counted in characters, not bytes.

use super::event::short_type_name;
use super::severity::Severity;

/// Maximum length of a generated issue title
pub const MAX_TITLE_LENGTH: usize = 80;

/// Longest short exception name kept in the prefix
const MAX_TYPE_LENGTH: usize = 30;

/// Suffixes are never squeezed below this many characters
const MIN_SUFFIX_LENGTH: usize = 10;

const ELLIPSIS: &str = "...";

/// Builder for issue titles
pub struct IssueTitle;

impl IssueTitle {
    /// `[Error][SEVERITY] ShortType: `
    pub fn prefix(severity: Severity, exception_type: &str) -> String {
        let short = short_type_name(exception_type);
        let short = if short.chars().count() > MAX_TYPE_LENGTH {
            format!("{}{}", take_chars(short, MAX_TYPE_LENGTH), ELLIPSIS)
        } else {
            short.to_string()
        };
        format!("[Error][{}] {}: ", severity.as_str().to_uppercase(), short)
    }

    /// Deterministic title built from the exception message
    pub fn rule_based(severity: Severity, exception_type: &str, message: &str) -> String {
        let prefix = Self::prefix(severity, exception_type);
        let mut suffix = normalize_whitespace(message);
        if suffix.is_empty() {
            suffix = "Unknown error".to_string();
        }
        let budget = Self::suffix_budget(&prefix);
        format!("{}{}", prefix, truncate(&suffix, budget))
    }

    /// Title using a generated suffix
    ///
    /// Returns `None` when the suffix is blank after normalization so the
    /// caller can fall back to [`IssueTitle::rule_based`].
    pub fn with_suffix(severity: Severity, exception_type: &str, suffix: &str) -> Option<String> {
        let suffix = Self::normalize_suffix(suffix)?;
        let prefix = Self::prefix(severity, exception_type);
        let budget = Self::suffix_budget(&prefix);
        Some(format!("{}{}", prefix, truncate(&suffix, budget)))
    }

    /// Collapses a generated suffix to one line and strips wrapping quotes
    pub fn normalize_suffix(raw: &str) -> Option<String> {
        let line = normalize_whitespace(raw);
        let trimmed = line
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
            .trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn suffix_budget(prefix: &str) -> usize {
        MAX_TITLE_LENGTH
            .saturating_sub(prefix.chars().count())
            .max(MIN_SUFFIX_LENGTH)
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    format!("{}{}", take_chars(s, keep), ELLIPSIS)
}
