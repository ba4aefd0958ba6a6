//! Slack incoming-webhook notifications

use reqwest::Client;
use serde::Serialize;

use errsight_core::config::SlackConfig;
use errsight_core::domain::{ErrorReport, Severity};
use errsight_core::ports::INotificationChannel;

use crate::HTTP_TIMEOUT;

const DEFAULT_USERNAME: &str = "Error Analyzer";
const DEFAULT_ICON: &str = ":warning:";

#[derive(Debug, Serialize)]
struct WebhookPayload {
    username: String,
    icon_emoji: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    color: &'static str,
    title: String,
    fields: Vec<Field>,
    footer: &'static str,
    ts: i64,
}

#[derive(Debug, Serialize)]
struct Field {
    title: &'static str,
    value: String,
    short: bool,
}

/// Posts analyzed reports at or above a severity threshold to Slack
pub struct SlackNotificationChannel {
    client: Client,
    webhook: Option<String>,
    min_severity: Severity,
    channel: Option<String>,
    username: String,
    icon: String,
}

impl SlackNotificationChannel {
    pub fn new(webhook: Option<String>, min_severity: Severity) -> Self {
        Self {
            client: Client::new(),
            webhook: webhook.filter(|w| !w.trim().is_empty()),
            min_severity,
            channel: None,
            username: DEFAULT_USERNAME.to_string(),
            icon: DEFAULT_ICON.to_string(),
        }
    }

    /// Builds a channel from `notification.slack`
    ///
    /// An unrecognized `min_severity` falls back to `high`.
    pub fn from_config(config: &SlackConfig) -> Self {
        let min_severity = config.min_severity.parse::<Severity>().unwrap_or_else(|_| {
            tracing::warn!(
                min_severity = %config.min_severity,
                "Unknown Slack min_severity, using high"
            );
            Severity::High
        });

        let mut channel = Self::new(config.webhook.clone(), min_severity);
        channel.channel = config.channel.clone().filter(|c| !c.trim().is_empty());
        if !config.username.trim().is_empty() {
            channel.username = config.username.clone();
        }
        if !config.icon.trim().is_empty() {
            channel.icon = config.icon.clone();
        }
        channel
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn payload(&self, report: &ErrorReport) -> WebhookPayload {
        let severity = report.severity();
        let color = match severity {
            Severity::Critical => "danger",
            Severity::High => "warning",
            _ => "good",
        };
        let analysis = report.analysis().result();
        let field_or_na = |value: Option<&str>| match value {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => "N/A".to_string(),
        };

        WebhookPayload {
            username: self.username.clone(),
            icon_emoji: self.icon.clone(),
            text: format!("{} error detected", severity.as_str().to_uppercase()),
            channel: self.channel.clone(),
            attachments: vec![Attachment {
                color,
                title: report.exception_type().to_string(),
                fields: vec![
                    Field {
                        title: "Severity",
                        value: severity.as_str().to_uppercase(),
                        short: true,
                    },
                    Field {
                        title: "Category",
                        value: report.category().to_string(),
                        short: true,
                    },
                    Field {
                        title: "Root Cause",
                        value: field_or_na(analysis.map(|a| a.root_cause.as_str())),
                        short: false,
                    },
                    Field {
                        title: "Impact",
                        value: field_or_na(analysis.map(|a| a.impact.as_str())),
                        short: false,
                    },
                    Field {
                        title: "File",
                        value: report.location(),
                        short: false,
                    },
                ],
                footer: "errsight",
                ts: chrono::Utc::now().timestamp(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl INotificationChannel for SlackNotificationChannel {
    async fn notify(&self, report: &ErrorReport) {
        if !self.should_notify(report.severity()) {
            return;
        }

        let webhook = match &self.webhook {
            Some(webhook) => webhook,
            None => {
                tracing::warn!(report_id = ?report.id(), "Slack webhook is not configured");
                return;
            }
        };

        let result = self
            .client
            .post(webhook)
            .timeout(HTTP_TIMEOUT)
            .json(&self.payload(report))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => tracing::info!(
                report_id = ?report.id(),
                severity = %report.severity(),
                "Slack notification sent"
            ),
            Err(e) => tracing::error!(
                report_id = ?report.id(),
                error = %e,
                "Slack notification failed"
            ),
        }
    }

    fn should_notify(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}

/// Channel used when notifications are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotificationChannel;

#[async_trait::async_trait]
impl INotificationChannel for NullNotificationChannel {
    async fn notify(&self, _report: &ErrorReport) {}

    fn should_notify(&self, _severity: Severity) -> bool {
        false
    }
}
