//! Error types for the triage pipeline.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Body extraction error: {0}")]
    Body(#[from] BodyError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("TLS initialisation failed: {0}")]
    Tls(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbound (IMAP) session errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Failed to connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected IMAP greeting: {0}")]
    Greeting(String),

    #[error("IMAP authentication failed for {username}: {response}")]
    AuthFailed { username: String, response: String },

    #[error("IMAP {command} failed: {response}")]
    CommandFailed { command: String, response: String },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("Failed to parse message {id}")]
    Parse { id: u32 },

    #[error("Mailbox task failed: {0}")]
    Task(String),
}

/// Body extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Cannot decode {content_type} payload as text: {reason}")]
    Decode {
        content_type: String,
        reason: String,
    },
}

/// Classification service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned no completion text")]
    EmptyResponse { provider: String },
}

/// Outbound (SMTP) delivery errors.
///
/// These never leave the mailbox writer; they are folded into
/// [`DeliveryOutcome::Failed`](crate::channels::email_types::DeliveryOutcome).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid {field} address: {reason}")]
    Address { field: &'static str, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("SMTP task failed: {0}")]
    Task(String),
}

/// Pipeline-level errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Fetching unread mail failed: {0}")]
    Fetch(#[from] MailboxError),

    #[error("{failed} of {total} message(s) could not be classified")]
    ItemsFailed { failed: usize, total: usize },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
