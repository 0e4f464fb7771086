//! Email channel: IMAP for the unread snapshot, SMTP via lettre for reports.

use std::io::{Read, Write};

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{debug, error, info, warn};

use crate::channels::email_body::{ParsedMessage, extract_body};
use crate::channels::email_types::{DeliveryOutcome, MailItem, OutboundReport};
use crate::channels::imap::ImapSession;
use crate::channels::{MailSource, ReportSink};
use crate::config::{ImapConfig, SmtpConfig};
use crate::error::{self, DeliveryError, MailboxError};

// ── Inbound ─────────────────────────────────────────────────────────

/// Mailbox reader over implicit-TLS IMAP.
pub struct ImapInbox {
    config: ImapConfig,
}

impl ImapInbox {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailSource for ImapInbox {
    async fn fetch_unread(&self) -> Result<Vec<MailItem>, MailboxError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut session =
                ImapSession::connect_tls(&config.host, config.port, config.read_timeout)?;
            fetch_unread_with(&mut session, &config)
        })
        .await
        .map_err(|e| MailboxError::Task(e.to_string()))?
    }
}

/// Log in, read the unread snapshot, and always attempt to log out.
///
/// A failed CLOSE or LOGOUT is logged and does not replace the primary result.
pub fn fetch_unread_with<S: Read + Write>(
    session: &mut ImapSession<S>,
    config: &ImapConfig,
) -> Result<Vec<MailItem>, MailboxError> {
    let result = session
        .login(&config.username, &config.password)
        .and_then(|()| read_unread(session, &config.mailbox));

    if result.is_ok()
        && let Err(e) = session.close()
    {
        warn!("IMAP CLOSE failed: {e}");
    }
    if let Err(e) = session.logout() {
        warn!("IMAP LOGOUT failed: {e}");
    }

    result
}

/// Select the mailbox, snapshot its unread IDs, and fetch each one.
///
/// Protocol failures abort the snapshot. A message that fails to parse or
/// decode is skipped so the rest of the batch still gets evaluated.
pub fn read_unread<S: Read + Write>(
    session: &mut ImapSession<S>,
    mailbox: &str,
) -> Result<Vec<MailItem>, MailboxError> {
    session.select(mailbox)?;
    let ids = session.search_unseen()?;
    info!(mailbox, count = ids.len(), "Unread snapshot taken");

    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        let raw = session.fetch_rfc822(id)?;
        match parse_mail_item(id, &raw) {
            Ok(item) => {
                debug!(id, subject = item.subject_text(), "Fetched message");
                items.push(item);
            }
            Err(e) => warn!(id, "Skipping message: {e}"),
        }
    }
    Ok(items)
}

/// Turn raw RFC 822 bytes into a [`MailItem`].
pub fn parse_mail_item(id: u32, raw: &[u8]) -> error::Result<MailItem> {
    let parsed = ParsedMessage::parse(raw).ok_or(MailboxError::Parse { id })?;
    let body = extract_body(&parsed.root)?;
    Ok(MailItem::new(parsed.subject, body))
}

// ── Outbound ────────────────────────────────────────────────────────

/// Mailbox writer: submits reports to the reviewer over STARTTLS SMTP.
pub struct SmtpOutbox {
    config: SmtpConfig,
    reviewer_address: String,
}

impl SmtpOutbox {
    pub fn new(config: SmtpConfig, reviewer_address: impl Into<String>) -> Self {
        Self {
            config,
            reviewer_address: reviewer_address.into(),
        }
    }

    /// Compose the MIME message for a report.
    pub fn build_message(&self, report: &OutboundReport) -> Result<Message, DeliveryError> {
        let from_address: Address =
            self.config
                .username
                .parse()
                .map_err(|e: lettre::address::AddressError| DeliveryError::Address {
                    field: "from",
                    reason: e.to_string(),
                })?;
        let from = Mailbox::new(Some(self.config.sender_name.clone()), from_address);

        let to: Mailbox =
            self.reviewer_address
                .parse()
                .map_err(|e: lettre::address::AddressError| DeliveryError::Address {
                    field: "to",
                    reason: e.to_string(),
                })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject.clone())
            .multipart(MultiPart::mixed().singlepart(SinglePart::plain(report.body.clone())))
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }

    async fn try_send(&self, report: &OutboundReport) -> Result<(), DeliveryError> {
        let message = self.build_message(report)?;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || deliver(&config, &message))
            .await
            .map_err(|e| DeliveryError::Task(e.to_string()))?
    }
}

/// Open a STARTTLS session, authenticate, send, and drop the transport.
fn deliver(config: &SmtpConfig, message: &Message) -> Result<(), DeliveryError> {
    let creds = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::starttls_relay(&config.host)
        .map_err(|e| DeliveryError::Transport(format!("SMTP relay error: {e}")))?
        .port(config.port)
        .credentials(creds)
        .build();

    transport
        .send(message)
        .map_err(|e| DeliveryError::Transport(format!("SMTP send failed: {e}")))?;
    Ok(())
}

#[async_trait]
impl ReportSink for SmtpOutbox {
    async fn send(&self, report: &OutboundReport) -> DeliveryOutcome {
        match self.try_send(report).await {
            Ok(()) => {
                info!(to = %self.reviewer_address, subject = %report.subject, "Report sent");
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                error!("Error: {e}");
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
