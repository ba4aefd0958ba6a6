//! Integration tests for errsight-providers
//!
//! Uses wiremock to simulate the Gemini, GitHub and Slack HTTP APIs and
//! verifies request shapes and the mapping of every response class.

mod common;

mod test_gemini_analyzer;
mod test_github_tracker;
mod test_slack_channel;
mod test_title_generator;
