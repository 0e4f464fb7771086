//! Triage pipeline.
//!
//! Every unread message flows through:
//! 1. `MailSource::fetch_unread()`: unread snapshot as `MailItem`s
//! 2. `PhishingClassifier::classify()`: free-text verdict from the LLM
//! 3. `report::compose()`: reviewer-facing subject and body
//! 4. `ReportSink::send()`: delivery to the reviewer mailbox

pub mod classifier;
pub mod driver;
pub mod report;

pub use classifier::PhishingClassifier;
pub use driver::TriagePipeline;
pub use report::compose;
