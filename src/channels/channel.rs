//! Mailbox seams used by the pipeline driver.

use async_trait::async_trait;

use crate::channels::email_types::{DeliveryOutcome, MailItem, OutboundReport};
use crate::error::MailboxError;

/// Source of work: the unread snapshot of an inbox.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetch every message unread at call time, in server order.
    async fn fetch_unread(&self) -> Result<Vec<MailItem>, MailboxError>;
}

/// Destination for evaluation reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one report. Failures are logged by the sink and returned as
    /// [`DeliveryOutcome::Failed`], never as an error.
    async fn send(&self, report: &OutboundReport) -> DeliveryOutcome;
}
