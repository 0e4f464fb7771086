//! Configuration types.
//!
//! Everything is read once at startup and handed to component constructors.
//! Nothing below `main` looks at the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default implicit-TLS IMAP port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Default folder to scan for unread mail.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Default classification model.
pub const DEFAULT_MODEL: &str = "llama-3.1-sonar-large-128k-online";

/// Default OpenAI-compatible endpoint of the classification service.
pub const DEFAULT_API_BASE: &str = "https://api.perplexity.ai";

/// Inbound mailbox settings.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub mailbox: String,
    /// Socket read timeout. `None` keeps the transport default.
    pub read_timeout: Option<Duration>,
}

/// Outbound submission settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Login name, also used as the From address.
    pub username: String,
    pub password: SecretString,
    /// Display name on the From mailbox.
    pub sender_name: String,
}

/// Classification service settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: SecretString,
    pub model: String,
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
    pub llm: LlmConfig,
    /// Where evaluation reports are sent.
    pub reviewer_address: String,
}

impl TriageConfig {
    /// Build config from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };
        // Credentials are passed through untouched.
        let secret = |key: &str| -> Result<SecretString, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let imap_port = match lookup("IMAP_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_port("IMAP_PORT", &raw)?,
            None => DEFAULT_IMAP_PORT,
        };

        let read_timeout = match lookup("IMAP_READ_TIMEOUT_SECS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(parse_secs("IMAP_READ_TIMEOUT_SECS", &raw)?),
            None => None,
        };

        let imap = ImapConfig {
            host: required("IMAP_SERVER")?,
            port: imap_port,
            username: required("IMAP_USERNAME")?,
            password: secret("IMAP_PASSWORD")?,
            mailbox: optional("IMAP_MAILBOX", DEFAULT_MAILBOX),
            read_timeout,
        };

        let smtp = SmtpConfig {
            host: required("SMTP_SERVER")?,
            port: parse_port("SMTP_PORT", &required("SMTP_PORT")?)?,
            username: required("SMTP_USERNAME")?,
            password: secret("SMTP_PASSWORD")?,
            sender_name: required("SENDER_NAME")?,
        };

        let llm = LlmConfig {
            api_base: optional("PHISH_TRIAGE_API_BASE", DEFAULT_API_BASE),
            api_key: secret("PERPLEX_API_KEY")?,
            model: optional("PHISH_TRIAGE_MODEL", DEFAULT_MODEL),
        };

        Ok(Self {
            imap,
            smtp,
            llm,
            reviewer_address: required("REPONSE_RECEIVER_MAIL")?,
        })
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a port number: {e}"),
        })
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a positive number of seconds"),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}
