//! Notification channel port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - `notify` consults `should_notify` itself and is a no-op below the
//!   configured threshold.
//! - Delivery failures are logged inside the implementation and never
//!   returned to the caller.

use crate::domain::{ErrorReport, Severity};

/// Severity-gated outbound notifications
#[async_trait::async_trait]
pub trait INotificationChannel: Send + Sync {
    async fn notify(&self, report: &ErrorReport);

    /// Whether a report of `severity` meets the configured minimum
    fn should_notify(&self, severity: Severity) -> bool;
}
