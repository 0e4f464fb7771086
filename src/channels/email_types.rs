//! Units of work flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// One unread message reduced to what the classifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    /// Subject header. `None` when the header is absent altogether.
    pub subject: Option<String>,
    /// Canonical plain-text body (may be empty).
    pub body: String,
}

impl MailItem {
    pub fn new(subject: Option<String>, body: impl Into<String>) -> Self {
        Self {
            subject,
            body: body.into(),
        }
    }

    /// Subject as text, empty when absent.
    pub fn subject_text(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }
}

/// Free-text judgement returned by the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Verdict(pub String);

impl Verdict {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Verdict {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Reviewer-facing message derived from a [`MailItem`] and its [`Verdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReport {
    pub subject: String,
    pub body: String,
}

/// Result of handing a report to the outbound mailbox.
///
/// Delivery failures are logged where they happen; this value only lets
/// the caller decide whether to escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}
