//! Analysis results and the analysis state stored on a report
//!
//! ## Stored shape
//!
//! The `analysis` column holds a JSON object whose `status` discriminates
//! the lifecycle stage:
//!
//! | Status       | Extra keys                                              |
//! |--------------|---------------------------------------------------------|
//! | `processing` | none                                                    |
//! | `completed`  | every [`AnalysisResult`] field, optional `github_issue` |
//! | `failed`     | `error: { kind, message, occurred_at }`                 |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::EnrichmentError;
use super::severity::Severity;

/// Category used when the analyzer does not provide one
pub const DEFAULT_CATEGORY: &str = "other";

// ============================================================================
// AnalysisResult
// ============================================================================

/// Structured diagnosis produced by an AI analyzer
///
/// All text fields are advisory; none is required to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub severity: Severity,
    pub category: String,
    pub root_cause: String,
    pub impact: String,
    pub immediate_action: String,
    pub recommended_fix: String,
    pub similar_issues: Vec<String>,
    pub prevention: String,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            severity: Severity::Medium,
            category: DEFAULT_CATEGORY.to_string(),
            root_cause: String::new(),
            impact: String::new(),
            immediate_action: String::new(),
            recommended_fix: String::new(),
            similar_issues: Vec::new(),
            prevention: String::new(),
        }
    }
}

impl AnalysisResult {
    /// Builds a result from a provider JSON object
    ///
    /// Unknown severities become `medium`, a missing or blank category becomes
    /// `other`, and non-string scalars are stringified.
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::InvalidShape` when `value` is not an object.
    pub fn from_json(value: &Value) -> Result<Self, EnrichmentError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EnrichmentError::InvalidShape(json_type_name(value).to_string()))?;

        let category = text_field(obj, "category");
        Ok(Self {
            severity: Severity::parse_lenient(&text_field(obj, "severity")),
            category: if category.trim().is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category.trim().to_lowercase()
            },
            root_cause: text_field(obj, "root_cause"),
            impact: text_field(obj, "impact"),
            immediate_action: text_field(obj, "immediate_action"),
            recommended_fix: text_field(obj, "recommended_fix"),
            similar_issues: list_field(obj, "similar_issues"),
            prevention: text_field(obj, "prevention"),
        })
    }

    fn write_into(&self, obj: &mut Map<String, Value>) {
        obj.insert("severity".into(), Value::String(self.severity.to_string()));
        obj.insert("category".into(), Value::String(self.category.clone()));
        obj.insert("root_cause".into(), Value::String(self.root_cause.clone()));
        obj.insert("impact".into(), Value::String(self.impact.clone()));
        obj.insert(
            "immediate_action".into(),
            Value::String(self.immediate_action.clone()),
        );
        obj.insert(
            "recommended_fix".into(),
            Value::String(self.recommended_fix.clone()),
        );
        obj.insert(
            "similar_issues".into(),
            Value::Array(
                self.similar_issues
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        obj.insert("prevention".into(), Value::String(self.prevention.clone()));
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// IssueResult
// ============================================================================

/// Outcome of an issue tracker call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Disabled,
    Created,
    MissingConfig,
    Unauthorized,
    Forbidden,
    RepositoryNotFound,
    ValidationFailed,
    RateLimited,
    RequestFailed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Disabled => "disabled",
            IssueStatus::Created => "created",
            IssueStatus::MissingConfig => "missing_config",
            IssueStatus::Unauthorized => "unauthorized",
            IssueStatus::Forbidden => "forbidden",
            IssueStatus::RepositoryNotFound => "repository_not_found",
            IssueStatus::ValidationFailed => "validation_failed",
            IssueStatus::RateLimited => "rate_limited",
            IssueStatus::RequestFailed => "request_failed",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result returned by an issue tracker; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueResult {
    pub status: IssueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IssueResult {
    /// The tracker is switched off
    pub fn disabled() -> Self {
        Self::with_status(IssueStatus::Disabled)
    }

    /// An issue was opened
    pub fn created(url: impl Into<String>, number: Option<u64>) -> Self {
        Self {
            status: IssueStatus::Created,
            url: Some(url.into()),
            number,
            message: None,
        }
    }

    /// The tracker could not open an issue
    pub fn failed(status: IssueStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(status)
        }
    }

    fn with_status(status: IssueStatus) -> Self {
        Self {
            status,
            url: None,
            number: None,
            message: None,
        }
    }
}

// ============================================================================
// Analysis lifecycle
// ============================================================================

/// Structured note recorded when enrichment fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Machine-readable failure kind (e.g. `quota_exhausted`)
    pub kind: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl AnalysisFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            occurred_at,
        }
    }

    /// Builds the note for an enrichment error
    pub fn from_error(error: &EnrichmentError, occurred_at: DateTime<Utc>) -> Self {
        Self::new(error.kind(), error.to_string(), occurred_at)
    }
}

/// Analysis state of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub enum Analysis {
    /// Placeholder written at reservation time
    Processing,
    /// Enrichment succeeded; the issue link is merged in later
    Completed {
        result: AnalysisResult,
        issue: Option<IssueResult>,
    },
    /// Enrichment failed; terminal for the reservation
    Failed(AnalysisFailure),
}

impl Analysis {
    pub const STATUS_PROCESSING: &'static str = "processing";
    pub const STATUS_COMPLETED: &'static str = "completed";
    pub const STATUS_FAILED: &'static str = "failed";

    /// Value of the stored `status` key
    pub fn status(&self) -> &'static str {
        match self {
            Analysis::Processing => Self::STATUS_PROCESSING,
            Analysis::Completed { .. } => Self::STATUS_COMPLETED,
            Analysis::Failed(_) => Self::STATUS_FAILED,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Analysis::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn issue(&self) -> Option<&IssueResult> {
        match self {
            Analysis::Completed { issue, .. } => issue.as_ref(),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AnalysisFailure> {
        match self {
            Analysis::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Renders the stored JSON object
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("status".into(), Value::String(self.status().to_string()));
        match self {
            Analysis::Processing => {}
            Analysis::Completed { result, issue } => {
                result.write_into(&mut obj);
                if let Some(issue) = issue {
                    // IssueResult only holds strings and integers
                    if let Ok(value) = serde_json::to_value(issue) {
                        obj.insert("github_issue".into(), value);
                    }
                }
            }
            Analysis::Failed(failure) => {
                obj.insert(
                    "error".into(),
                    serde_json::json!({
                        "kind": failure.kind,
                        "message": failure.message,
                        "occurred_at": failure.occurred_at.to_rfc3339(),
                    }),
                );
            }
        }
        Value::Object(obj)
    }

    /// Parses a stored JSON object
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| "analysis is missing a status".to_string())?;

        match status {
            Self::STATUS_PROCESSING => Ok(Analysis::Processing),
            Self::STATUS_COMPLETED => {
                let result = AnalysisResult::from_json(value).map_err(|e| e.to_string())?;
                let issue = match value.get("github_issue") {
                    Some(raw) if !raw.is_null() => Some(
                        serde_json::from_value(raw.clone())
                            .map_err(|e| format!("invalid github_issue: {}", e))?,
                    ),
                    _ => None,
                };
                Ok(Analysis::Completed { result, issue })
            }
            Self::STATUS_FAILED => {
                let error = value.get("error").cloned().unwrap_or(Value::Null);
                let failure = serde_json::from_value(error)
                    .map_err(|e| format!("invalid failure note: {}", e))?;
                Ok(Analysis::Failed(failure))
            }
            other => Err(format!("unknown analysis status: {}", other)),
        }
    }
}

impl From<Analysis> for Value {
    fn from(analysis: Analysis) -> Self {
        analysis.to_json()
    }
}

impl TryFrom<Value> for Analysis {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Analysis::from_json(&value)
    }
}
