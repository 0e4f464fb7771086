//! Inbound and outbound mail.

pub mod channel;
pub mod email;
pub mod email_body;
pub mod email_types;
pub mod imap;

pub use channel::*;
pub use email::{ImapInbox, SmtpOutbox};
pub use email_body::{MimePart, ParsedMessage, Payload, extract_body};
pub use email_types::{DeliveryOutcome, MailItem, OutboundReport, Verdict};
