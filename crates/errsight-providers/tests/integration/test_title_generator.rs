//! GeminiIssueTitleGenerator quota accounting and normalization

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use errsight_core::domain::Severity;
use errsight_core::ports::IIssueTitleGenerator;
use errsight_providers::GeminiIssueTitleGenerator;

use crate::common;

#[tokio::test]
async fn test_suffix_is_single_line_without_quotes() {
    let server = MockServer::start().await;
    common::mount_gemini_text(&server, "```\n`Payment gateway declines cards`\n```").await;
    let quota = common::quota(5);
    let generator = GeminiIssueTitleGenerator::new(common::gemini_client(&server), quota.clone());

    let (report, analysis) = common::analyzed_report(Severity::High);
    let suffix = generator
        .generate_title_suffix(&report, &analysis, report.context())
        .await;

    assert_eq!(suffix.as_deref(), Some("Payment gateway declines cards"));
    assert_eq!(quota.remaining_quota().await.unwrap(), 4);
}

#[tokio::test]
async fn test_exhausted_quota_skips_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let generator = GeminiIssueTitleGenerator::new(common::gemini_client(&server), common::quota(0));

    let (report, analysis) = common::analyzed_report(Severity::Critical);
    let suffix = generator
        .generate_title_suffix(&report, &analysis, report.context())
        .await;

    assert!(suffix.is_none());
}

#[tokio::test]
async fn test_blank_output_yields_none() {
    let server = MockServer::start().await;
    common::mount_gemini_text(&server, " \"\" ").await;
    let generator = GeminiIssueTitleGenerator::new(common::gemini_client(&server), common::quota(5));

    let (report, analysis) = common::analyzed_report(Severity::Low);
    assert!(generator
        .generate_title_suffix(&report, &analysis, report.context())
        .await
        .is_none());
}
