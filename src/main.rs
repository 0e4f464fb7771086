use std::sync::Arc;

use phish_triage::channels::{ImapInbox, SmtpOutbox};
use phish_triage::config::TriageConfig;
use phish_triage::error::{Error, Result};
use phish_triage::llm::create_provider;
use phish_triage::pipeline::{PhishingClassifier, TriagePipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| Error::Tls("failed to install rustls crypto provider".into()))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TriageConfig::from_env()?;

    tracing::info!(
        imap = %config.imap.host,
        smtp = %config.smtp.host,
        reviewer = %config.reviewer_address,
        "Phish Triage v{}",
        env!("CARGO_PKG_VERSION")
    );

    let llm = create_provider(&config.llm);
    let pipeline = TriagePipeline::new(
        Arc::new(ImapInbox::new(config.imap.clone())),
        PhishingClassifier::new(llm),
        Arc::new(SmtpOutbox::new(
            config.smtp.clone(),
            config.reviewer_address.clone(),
        )),
    );

    pipeline.run().await?;
    Ok(())
}
