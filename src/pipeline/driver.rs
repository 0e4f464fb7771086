//! Pipeline driver: fetch, classify, compose, send, one item at a time.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::channels::email_types::DeliveryOutcome;
use crate::channels::{MailSource, ReportSink};
use crate::error::PipelineError;
use crate::pipeline::classifier::PhishingClassifier;
use crate::pipeline::report::compose;

/// Wires a mail source, the classifier and a report sink together.
pub struct TriagePipeline {
    source: Arc<dyn MailSource>,
    classifier: PhishingClassifier,
    sink: Arc<dyn ReportSink>,
}

impl TriagePipeline {
    pub fn new(
        source: Arc<dyn MailSource>,
        classifier: PhishingClassifier,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            source,
            classifier,
            sink,
        }
    }

    /// Process the current unread snapshot once.
    ///
    /// Fetch failures abort the run. A classification failure skips that
    /// item and the run carries on; the count is returned as
    /// [`PipelineError::ItemsFailed`] afterwards. Delivery failures are
    /// logged by the sink and do not fail the run.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_inner()
            .instrument(info_span!("triage_run", %run_id))
            .await
    }

    async fn run_inner(&self) -> Result<(), PipelineError> {
        let items = self.source.fetch_unread().await?;
        let total = items.len();
        if total == 0 {
            info!("No unread messages");
            return Ok(());
        }
        info!(total, "Evaluating unread messages");

        let mut failed = 0;
        let mut undelivered = 0;

        for (index, item) in items.iter().enumerate() {
            let verdict = match self.classifier.classify(item).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    error!(
                        index,
                        subject = item.subject_text(),
                        error = %e,
                        "Classification failed, skipping message"
                    );
                    failed += 1;
                    continue;
                }
            };

            let report = compose(item, &verdict);
            if let DeliveryOutcome::Failed { reason } = self.sink.send(&report).await {
                warn!(index, subject = %report.subject, %reason, "Report not delivered");
                undelivered += 1;
            }
        }

        info!(total, failed, undelivered, "Run complete");

        if failed > 0 {
            return Err(PipelineError::ItemsFailed { failed, total });
        }
        Ok(())
    }
}
