//! GeminiAnalyzer against a mocked generateContent endpoint

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errsight_core::domain::{EnrichmentError, ErrorContext, Severity};
use errsight_core::ports::{AnalysisRequest, IAiAnalyzer};
use errsight_providers::GeminiAnalyzer;

use crate::common;

fn request(context: &ErrorContext) -> AnalysisRequest<'_> {
    AnalysisRequest {
        exception_type: "QueryException",
        message: "SQLSTATE[40001]: deadlock",
        file: "app/Orders.php",
        line: 120,
        trace: "#0 Orders->save()",
        context,
    }
}

#[tokio::test]
async fn test_analyze_parses_fenced_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", common::MODEL)))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 8000}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here you go:\n```json\n{\"severity\": \"HIGH\", \"category\": \"database\","},
                {"text": " \"root_cause\": \"lock ordering\", \"similar_issues\": \"none\"}\n```"}
            ]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = GeminiAnalyzer::new(common::gemini_client(&server));
    let context = ErrorContext::new();
    let result = analyzer.analyze(request(&context)).await.expect("analysis");

    assert_eq!(result.severity, Severity::High);
    assert_eq!(result.category, "database");
    assert_eq!(result.root_cause, "lock ordering");
    assert_eq!(result.similar_issues, vec!["none".to_string()]);
}

#[tokio::test]
async fn test_analyze_empty_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let analyzer = GeminiAnalyzer::new(common::gemini_client(&server));
    let context = ErrorContext::new();
    let err = analyzer.analyze(request(&context)).await.unwrap_err();
    assert_eq!(err, EnrichmentError::EmptyResponse);
}

#[tokio::test]
async fn test_analyze_prose_is_parse_error() {
    let server = MockServer::start().await;
    common::mount_gemini_text(&server, "The error is probably a deadlock.").await;

    let analyzer = GeminiAnalyzer::new(common::gemini_client(&server));
    let context = ErrorContext::new();
    let err = analyzer.analyze(request(&context)).await.unwrap_err();
    assert_eq!(err.kind(), "parse_error");
}

#[tokio::test]
async fn test_analyze_http_error_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted"}
        })))
        .mount(&server)
        .await;

    let analyzer = GeminiAnalyzer::new(common::gemini_client(&server));
    let context = ErrorContext::new();
    let err = analyzer.analyze(request(&context)).await.unwrap_err();
    assert_eq!(
        err,
        EnrichmentError::Provider {
            status: 429,
            message: "Resource has been exhausted".into()
        }
    );
}

#[tokio::test]
async fn test_analyze_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"candidates": []}))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = common::gemini_client(&server).with_timeout(std::time::Duration::from_millis(200));
    let analyzer = GeminiAnalyzer::new(client);
    let context = ErrorContext::new();
    let err = analyzer.analyze(request(&context)).await.unwrap_err();
    assert_eq!(err, EnrichmentError::Timeout);
}
