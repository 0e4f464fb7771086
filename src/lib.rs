//! Phish Triage: forwarded-mail phishing evaluation.

pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
