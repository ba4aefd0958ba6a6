//! SlackNotificationChannel threshold and payload

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errsight_core::config::SlackConfig;
use errsight_core::domain::Severity;
use errsight_core::ports::INotificationChannel;
use errsight_providers::SlackNotificationChannel;

use crate::common;

fn channel(server: &MockServer) -> SlackNotificationChannel {
    SlackNotificationChannel::from_config(&SlackConfig {
        webhook: Some(format!("{}/services/T000/B000", server.uri())),
        channel: Some("#alerts".into()),
        ..SlackConfig::default()
    })
}

#[tokio::test]
async fn test_critical_report_is_posted_with_danger_color() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T000/B000"))
        .and(body_partial_json(json!({
            "username": "Error Analyzer",
            "icon_emoji": ":warning:",
            "channel": "#alerts",
            "attachments": [{
                "color": "danger",
                "title": "App\\Exceptions\\PaymentException"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let (report, _) = common::analyzed_report(Severity::Critical);
    channel(&server).notify(&report).await;
}

#[tokio::test]
async fn test_fields_carry_analysis_and_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (report, _) = common::analyzed_report(Severity::High);
    channel(&server).notify(&report).await;

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let fields = body["attachments"][0]["fields"].as_array().unwrap();
    let value = |title: &str| {
        fields
            .iter()
            .find(|f| f["title"] == title)
            .and_then(|f| f["value"].as_str())
            .map(str::to_string)
    };
    assert_eq!(body["attachments"][0]["color"], "warning");
    assert_eq!(value("Severity").as_deref(), Some("HIGH"));
    assert_eq!(value("Category").as_deref(), Some("payment"));
    assert_eq!(value("Root Cause").as_deref(), Some("Gateway rejected the card"));
    assert_eq!(value("File").as_deref(), Some("app/Payments.php:88"));
}

#[tokio::test]
async fn test_below_threshold_is_not_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (report, _) = common::analyzed_report(Severity::Medium);
    channel(&server).notify(&report).await;
}

#[tokio::test]
async fn test_webhook_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (report, _) = common::analyzed_report(Severity::Critical);
    channel(&server).notify(&report).await;
}

#[tokio::test]
async fn test_missing_webhook_is_a_noop() {
    let channel = SlackNotificationChannel::new(None, Severity::Low);
    let (report, _) = common::analyzed_report(Severity::Critical);
    channel.notify(&report).await;
}
