//! Phishing classifier: one chat completion per mail item.
//!
//! The verdict is the model's free text, passed through untouched.

use std::sync::Arc;

use tracing::{debug, info};

use crate::channels::email_types::{MailItem, Verdict};
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Frames the assistant and warns that input has been forwarded.
pub const SYSTEM_PROMPT: &str = "You are an artificial intelligence cybersecurity assistant and you need to detect phishing in emails. Please note that these e-mails have been forwarded before you receive them. ";

/// Leads the user message, before the subject and body are appended.
pub const USER_PREAMBLE: &str = "The following email has been forwarded once and attachments might be removed in the process of forwarding. Do you think the initial first email is phishing? Please do not add any formatting to your response. ";

/// Build the system + user message pair for one item.
pub fn build_messages(item: &MailItem) -> Vec<ChatMessage> {
    let user = format!(
        "{USER_PREAMBLE}The Subject is: {}The Mail is: {}",
        item.subject_text(),
        item.body
    );
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Asks the classification service whether the original message was phishing.
pub struct PhishingClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl PhishingClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// One request, no retries, first candidate's text returned verbatim.
    pub async fn classify(&self, item: &MailItem) -> Result<Verdict, LlmError> {
        debug!(
            model = self.llm.model_name(),
            subject = item.subject_text(),
            body_len = item.body.len(),
            "Requesting phishing evaluation"
        );
        let request = CompletionRequest::new(build_messages(item));
        let response = self.llm.complete(request).await?;
        info!(
            subject = item.subject_text(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Phishing evaluation received"
        );
        Ok(Verdict(response.content))
    }
}
