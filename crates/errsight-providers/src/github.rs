//! GitHub issue tracker
//!
//! Opens one issue per analyzed report through the REST API
//! (`POST /repos/{owner}/{repo}/issues`). Every failure is folded into an
//! [`IssueResult`] status; nothing here returns an error to the caller.

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use errsight_core::config::GithubConfig;
use errsight_core::domain::{
    AnalysisResult, ErrorContext, ErrorReport, IssueResult, IssueStatus, IssueTitle,
};
use errsight_core::ports::{IIssueTitleGenerator, IIssueTracker};

use crate::title::NullIssueTitleGenerator;
use crate::{error_message, HTTP_TIMEOUT};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "errsight";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Serialize)]
struct CreateIssueRequest {
    title: String,
    body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    html_url: Option<String>,
    number: Option<u64>,
}

/// `IIssueTracker` backed by GitHub issues
pub struct GithubIssueTracker {
    client: Client,
    api_base: String,
    token: Option<String>,
    repository: Option<String>,
    labels: Vec<String>,
    assignees: Vec<String>,
    title_generator: Arc<dyn IIssueTitleGenerator + Send + Sync>,
}

impl GithubIssueTracker {
    pub fn new(token: Option<String>, repository: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: GITHUB_API_BASE.to_string(),
            token: non_blank(token),
            repository: non_blank(repository),
            labels: Vec::new(),
            assignees: Vec::new(),
            title_generator: Arc::new(NullIssueTitleGenerator),
        }
    }

    /// Builds a tracker from the `issue_tracker.github` config section
    pub fn from_config(
        config: &GithubConfig,
        title_generator: Arc<dyn IIssueTitleGenerator + Send + Sync>,
    ) -> Self {
        Self::new(config.token.clone(), config.repository.clone())
            .with_api_base(&config.api_base)
            .with_labels(config.labels.clone())
            .with_assignees(config.assignees.clone())
            .with_title_generator(title_generator)
    }

    /// Overrides the API root (useful for testing)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = normalize_list(labels);
        self
    }

    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = normalize_list(assignees);
        self
    }

    pub fn with_title_generator(
        mut self,
        title_generator: Arc<dyn IIssueTitleGenerator + Send + Sync>,
    ) -> Self {
        self.title_generator = title_generator;
        self
    }

    /// Generated title when the suffix survives normalization, rule-based otherwise
    async fn build_title(
        &self,
        report: &ErrorReport,
        analysis: &AnalysisResult,
        context: &ErrorContext,
    ) -> String {
        let fallback =
            IssueTitle::rule_based(report.severity(), report.exception_type(), report.message());

        match self
            .title_generator
            .generate_title_suffix(report, analysis, context)
            .await
        {
            Some(suffix) => {
                IssueTitle::with_suffix(report.severity(), report.exception_type(), &suffix)
                    .unwrap_or(fallback)
            }
            None => fallback,
        }
    }

    async fn send(&self, token: &str, repository: &str, payload: &CreateIssueRequest) -> IssueResult {
        let url = format!("{}/repos/{}/issues", self.api_base, repository);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .timeout(HTTP_TIMEOUT)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return IssueResult::failed(IssueStatus::RequestFailed, e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<CreatedIssue>().await {
                Ok(created) => IssueResult {
                    status: IssueStatus::Created,
                    url: created.html_url,
                    number: created.number,
                    message: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "GitHub issue created but response was unreadable");
                    IssueResult {
                        status: IssueStatus::Created,
                        url: None,
                        number: None,
                        message: None,
                    }
                }
            };
        }

        let mapped = map_error_status(&response);
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("GitHub responded with HTTP {}", status.as_u16())
        } else {
            error_message(&body)
        };
        IssueResult::failed(mapped, message)
    }
}

#[async_trait::async_trait]
impl IIssueTracker for GithubIssueTracker {
    async fn create_issue(
        &self,
        report: &ErrorReport,
        analysis: &AnalysisResult,
        trace: &str,
        context: &ErrorContext,
    ) -> IssueResult {
        let (token, repository) = match (&self.token, &self.repository) {
            (Some(token), Some(repository)) => (token, repository),
            _ => {
                let message = "GitHub issue tracking is enabled but token or repository is not set";
                tracing::warn!(
                    report_id = ?report.id(),
                    has_token = self.token.is_some(),
                    repository = ?self.repository,
                    "{}",
                    message
                );
                return IssueResult::failed(IssueStatus::MissingConfig, message);
            }
        };

        let payload = CreateIssueRequest {
            title: self.build_title(report, analysis, context).await,
            body: render_body(report, analysis, trace, context),
            labels: self.labels.clone(),
            assignees: self.assignees.clone(),
        };

        let result = self.send(token, repository, &payload).await;
        match result.status {
            IssueStatus::Created => tracing::info!(
                report_id = ?report.id(),
                url = ?result.url,
                number = ?result.number,
                "GitHub issue created"
            ),
            status => tracing::error!(
                report_id = ?report.id(),
                status = %status,
                message = ?result.message,
                "GitHub issue creation failed"
            ),
        }
        result
    }
}

fn map_error_status(response: &Response) -> IssueStatus {
    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        let exhausted = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false);
        if exhausted {
            return IssueStatus::RateLimited;
        }
    }

    match status {
        StatusCode::UNAUTHORIZED => IssueStatus::Unauthorized,
        StatusCode::FORBIDDEN => IssueStatus::Forbidden,
        StatusCode::NOT_FOUND => IssueStatus::RepositoryNotFound,
        StatusCode::UNPROCESSABLE_ENTITY => IssueStatus::ValidationFailed,
        _ => IssueStatus::RequestFailed,
    }
}

fn render_body(
    report: &ErrorReport,
    analysis: &AnalysisResult,
    trace: &str,
    context: &ErrorContext,
) -> String {
    let text = |key: &str, default: &str| -> String {
        context
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    };
    let or_na = |value: &str| -> String {
        if value.trim().is_empty() {
            "N/A".to_string()
        } else {
            value.to_string()
        }
    };
    let similar = if analysis.similar_issues.is_empty() {
        "- N/A".to_string()
    } else {
        analysis
            .similar_issues
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let context_json = serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".into());
    let report_id = report
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "N/A".into());

    format!(
        "## Summary\n\
         - Report ID: {id}\n\
         - Severity: {severity}\n\
         - Category: {category}\n\
         - Exception: {exception}\n\
         - Message: {message}\n\
         - Location: {location}\n\
         - Occurred at: {occurred_at}\n\
         - Fingerprint: {fingerprint}\n\
         - Request URL: {url}\n\
         - User ID: {user_id}\n\
         - Environment: {environment}\n\
         \n\
         ## AI Analysis\n\
         - Root cause: {root_cause}\n\
         - Impact: {impact}\n\
         - Immediate action: {immediate_action}\n\
         - Recommended fix: {recommended_fix}\n\
         - Prevention: {prevention}\n\
         - Similar issues:\n\
         {similar}\n\
         \n\
         ## Stack Trace\n\
         ```\n\
         {trace}\n\
         ```\n\
         \n\
         ## Context\n\
         ```json\n\
         {context_json}\n\
         ```\n",
        id = report_id,
        severity = report.severity(),
        category = report.category(),
        exception = report.exception_type(),
        message = report.message(),
        location = report.location(),
        occurred_at = report.occurred_at().to_rfc3339(),
        fingerprint = report.fingerprint(),
        url = text("url", "N/A"),
        user_id = text("user_id", "guest"),
        environment = text("environment", "N/A"),
        root_cause = or_na(&analysis.root_cause),
        impact = or_na(&analysis.impact),
        immediate_action = or_na(&analysis.immediate_action),
        recommended_fix = or_na(&analysis.recommended_fix),
        prevention = or_na(&analysis.prevention),
        similar = similar,
        trace = trace,
        context_json = context_json,
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Tracker used when issue creation is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIssueTracker;

#[async_trait::async_trait]
impl IIssueTracker for NullIssueTracker {
    async fn create_issue(
        &self,
        _report: &ErrorReport,
        _analysis: &AnalysisResult,
        _trace: &str,
        _context: &ErrorContext,
    ) -> IssueResult {
        IssueResult::disabled()
    }
}
