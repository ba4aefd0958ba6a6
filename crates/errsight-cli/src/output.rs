//! Output formatting for human and JSON modes

use errsight_core::domain::ErrorReport;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output with status marks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output; informational lines are suppressed
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// One table row per report: id, type, severity, category, time, status
pub fn report_row(report: &ErrorReport) -> String {
    format!(
        "{:<6} {:<30} {:<9} {:<14} {:<19} {}",
        report
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into()),
        truncate(report.short_type(), 30),
        report.severity().as_str(),
        truncate(report.category(), 14),
        report.occurred_at().format("%Y-%m-%d %H:%M:%S").to_string(),
        report.analysis().status(),
    )
}

pub fn report_header() -> String {
    format!(
        "{:<6} {:<30} {:<9} {:<14} {:<19} {}",
        "ID", "Exception", "Severity", "Category", "Occurred (UTC)", "Status"
    )
}

/// Multi-line detail view of a report
pub fn print_report(report: &ErrorReport, formatter: &dyn OutputFormatter) {
    let id = report
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".into());
    formatter.success(&format!("Error report {}", id));
    formatter.info(&format!("Exception:   {}", report.exception_type()));
    formatter.info(&format!("Message:     {}", report.message()));
    formatter.info(&format!("Location:    {}", report.location()));
    formatter.info(&format!("Severity:    {}", report.severity()));
    formatter.info(&format!("Category:    {}", report.category()));
    formatter.info(&format!(
        "Occurred:    {}",
        report.occurred_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    formatter.info(&format!("Fingerprint: {}", report.fingerprint()));
    if let Some(resolved) = report.resolved_at() {
        formatter.info(&format!("Resolved:    {}", resolved.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    formatter.info(&format!("Analysis:    {}", report.analysis().status()));

    if let Some(result) = report.analysis().result() {
        let sections = [
            ("Root cause", &result.root_cause),
            ("Impact", &result.impact),
            ("Immediate action", &result.immediate_action),
            ("Recommended fix", &result.recommended_fix),
            ("Prevention", &result.prevention),
        ];
        for (title, text) in sections {
            if !text.trim().is_empty() {
                formatter.info("");
                formatter.info(&format!("[{}]", title));
                formatter.info(text);
            }
        }
        if !result.similar_issues.is_empty() {
            formatter.info("");
            formatter.info("[Similar issues]");
            for item in &result.similar_issues {
                formatter.info(&format!("- {}", item));
            }
        }
    }

    if let Some(issue) = report.analysis().issue() {
        formatter.info("");
        formatter.info(&format!("[Issue] {}", issue.status));
        if let Some(url) = &issue.url {
            formatter.info(url);
        }
        if let Some(message) = &issue.message {
            formatter.info(message);
        }
    }

    if let Some(failure) = report.analysis().failure() {
        formatter.info("");
        formatter.warn(&format!("Analysis failed ({}): {}", failure.kind, failure.message));
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("database", 14), "database");
    }

    #[test]
    fn truncate_marks_cut_values() {
        assert_eq!(truncate("authentication-flow", 10), "authent...");
    }

    #[test]
    fn header_and_row_align() {
        use errsight_core::domain::{DedupeWindow, ErrorEvent, Fingerprint, ReportId};

        let event = ErrorEvent::new("App\\RuntimeException", "boom", "a.rs", 1);
        let fp = Fingerprint::compute(&event.exception_type, &event.file, event.line);
        let window = DedupeWindow::compute(event.occurred_at, 5).unwrap();
        let report = ErrorReport::reserve(&event, fp, window).with_id(ReportId::new(12));

        let row = report_row(&report);
        assert!(row.starts_with("12     RuntimeException"));
        assert!(row.ends_with("processing"));
        assert_eq!(report_header().find("Severity"), row.find("medium"));
    }
}
