//! GithubIssueTracker status mapping and request shape

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errsight_core::domain::{IssueStatus, Severity};
use errsight_core::ports::IIssueTracker;
use errsight_providers::{GeminiIssueTitleGenerator, GithubIssueTracker};

use crate::common;

const REPO: &str = "acme/shop";

fn tracker(server: &MockServer) -> GithubIssueTracker {
    GithubIssueTracker::new(Some("gh-token".into()), Some(REPO.into()))
        .with_api_base(server.uri())
        .with_labels(vec!["bug".into(), " ".into(), " error-analysis ".into()])
}

async fn respond_with(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/issues", REPO)))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn create(tracker: &GithubIssueTracker) -> errsight_core::domain::IssueResult {
    let (report, analysis) = common::analyzed_report(Severity::High);
    tracker
        .create_issue(&report, &analysis, "#0 {main}", report.context())
        .await
}

#[tokio::test]
async fn test_created_returns_url_and_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/issues", REPO)))
        .and(header("authorization", "Bearer gh-token"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(body_partial_json(json!({
            "title": "[Error][HIGH] PaymentException: Card declined for order",
            "labels": ["bug", "error-analysis"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "html_url": "https://github.com/acme/shop/issues/7",
            "number": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = create(&tracker(&server)).await;

    assert_eq!(result.status, IssueStatus::Created);
    assert_eq!(result.url.as_deref(), Some("https://github.com/acme/shop/issues/7"));
    assert_eq!(result.number, Some(7));
}

#[tokio::test]
async fn test_body_is_markdown_with_trace() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(201).set_body_json(json!({"html_url": "u", "number": 1})),
    )
    .await;

    create(&tracker(&server)).await;

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let markdown = body["body"].as_str().expect("body string");
    assert!(markdown.contains("- Report ID: 42"));
    assert!(markdown.contains("- Root cause: Gateway rejected the card"));
    assert!(markdown.contains("#0 {main}"));
    assert!(body.get("assignees").is_none());
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
    )
    .await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::Unauthorized);
    assert_eq!(result.message.as_deref(), Some("Bad credentials"));
}

#[tokio::test]
async fn test_forbidden() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(403)
            .insert_header("X-RateLimit-Remaining", "12")
            .set_body_json(json!({"message": "Resource not accessible by integration"})),
    )
    .await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::Forbidden);
}

#[tokio::test]
async fn test_rate_limited() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(403)
            .insert_header("X-RateLimit-Remaining", "0")
            .set_body_json(json!({"message": "API rate limit exceeded"})),
    )
    .await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::RateLimited);
    assert_eq!(result.message.as_deref(), Some("API rate limit exceeded"));
}

#[tokio::test]
async fn test_repository_not_found() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
    )
    .await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::RepositoryNotFound);
}

#[tokio::test]
async fn test_validation_failed() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        ResponseTemplate::new(422).set_body_json(json!({"message": "Validation Failed"})),
    )
    .await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::ValidationFailed);
}

#[tokio::test]
async fn test_server_error_is_request_failed() {
    let server = MockServer::start().await;
    respond_with(&server, ResponseTemplate::new(500)).await;

    let result = create(&tracker(&server)).await;
    assert_eq!(result.status, IssueStatus::RequestFailed);
    assert_eq!(result.message.as_deref(), Some("GitHub responded with HTTP 500"));
}

#[tokio::test]
async fn test_unreachable_host_is_request_failed() {
    let tracker = GithubIssueTracker::new(Some("t".into()), Some(REPO.into()))
        .with_api_base("http://127.0.0.1:9");

    let result = create(&tracker).await;
    assert_eq!(result.status, IssueStatus::RequestFailed);
    assert!(result.message.is_some());
}

#[tokio::test]
async fn test_generated_title_suffix_is_used() {
    let gemini = MockServer::start().await;
    common::mount_gemini_text(&gemini, "  \"Card gateway rejects\n checkout payments\"  ").await;
    let generator = GeminiIssueTitleGenerator::new(common::gemini_client(&gemini), common::quota(10));

    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "title": "[Error][HIGH] PaymentException: Card gateway rejects checkout payments"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"html_url": "u", "number": 2})))
        .expect(1)
        .mount(&github)
        .await;

    let tracker = tracker(&github).with_title_generator(Arc::new(generator));
    let result = create(&tracker).await;
    assert_eq!(result.status, IssueStatus::Created);
}

#[tokio::test]
async fn test_failed_title_generation_falls_back_to_rule_based() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&gemini)
        .await;
    let generator = GeminiIssueTitleGenerator::new(common::gemini_client(&gemini), common::quota(10));

    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "title": "[Error][HIGH] PaymentException: Card declined for order"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"html_url": "u", "number": 3})))
        .expect(1)
        .mount(&github)
        .await;

    let tracker = tracker(&github).with_title_generator(Arc::new(generator));
    assert_eq!(create(&tracker).await.status, IssueStatus::Created);
}
