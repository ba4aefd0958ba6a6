//! Shared fixtures for provider integration tests

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errsight_cache::InMemoryCacheStore;
use errsight_core::domain::{AnalysisResult, DedupeWindow, ErrorEvent, ErrorReport, Fingerprint, ReportId, Severity};
use errsight_core::usecases::QuotaGate;
use errsight_providers::GeminiClient;

pub const MODEL: &str = "gemini-test";

/// Gemini client pointed at the mock server
pub fn gemini_client(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url("test-key", MODEL, server.uri())
}

/// Mounts a `generateContent` endpoint answering with `text`
pub async fn mount_gemini_text(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/models/.+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })))
        .mount(server)
        .await;
}

pub fn quota(limit: u32) -> Arc<QuotaGate> {
    Arc::new(QuotaGate::new(Arc::new(InMemoryCacheStore::new()), limit))
}

/// Analyzed report with id 42
pub fn analyzed_report(severity: Severity) -> (ErrorReport, AnalysisResult) {
    let event = ErrorEvent::new(
        "App\\Exceptions\\PaymentException",
        "Card   declined\nfor order",
        "app/Payments.php",
        88,
    )
    .with_context("environment", "production")
    .with_context("url", "https://shop.example.com/checkout");
    let fp = Fingerprint::compute(&event.exception_type, &event.file, event.line);
    let window = DedupeWindow::compute(event.occurred_at, 5).expect("window");
    let mut report = ErrorReport::reserve(&event, fp, window).with_id(ReportId::new(42));

    let analysis = AnalysisResult {
        severity,
        category: "payment".into(),
        root_cause: "Gateway rejected the card".into(),
        impact: "Checkout fails".into(),
        ..AnalysisResult::default()
    };
    report.mark_analyzed(analysis.clone()).expect("processing");
    (report, analysis)
}
