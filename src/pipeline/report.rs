//! Report composer: pure string assembly, no failure modes.

use crate::channels::email_types::{MailItem, OutboundReport, Verdict};

pub const SUBJECT_PREFIX: &str = "Phishing evaluation for: ";
pub const EVALUATION_HEADER: &str = "The evaluation of the phishing status is:\n";
pub const ORIGINAL_HEADER: &str = "The initial email was:\n";

/// Build the reviewer-facing report for one item.
pub fn compose(item: &MailItem, verdict: &Verdict) -> OutboundReport {
    let subject = format!("{SUBJECT_PREFIX}{}", item.subject_text());

    let mut body = String::with_capacity(
        EVALUATION_HEADER.len()
            + verdict.as_str().len()
            + ORIGINAL_HEADER.len()
            + item.body.len()
            + 2,
    );
    body.push_str(EVALUATION_HEADER);
    body.push_str(verdict.as_str());
    body.push('\n');
    body.push_str(ORIGINAL_HEADER);
    body.push_str(&item.body);
    body.push('\n');

    OutboundReport { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> (MailItem, Verdict) {
        (
            MailItem::new(Some("Invoice Due".into()), "Please pay now via link X"),
            Verdict(
                "This appears to be phishing due to urgency and an unsolicited payment link."
                    .into(),
            ),
        )
    }

    #[test]
    fn subject_has_prefix() {
        let (item, verdict) = invoice();
        let report = compose(&item, &verdict);
        assert_eq!(report.subject, "Phishing evaluation for: Invoice Due");
    }

    #[test]
    fn body_layout_is_exact() {
        let (item, verdict) = invoice();
        let report = compose(&item, &verdict);
        assert_eq!(
            report.body,
            "The evaluation of the phishing status is:\n\
             This appears to be phishing due to urgency and an unsolicited payment link.\n\
             The initial email was:\n\
             Please pay now via link X\n"
        );
    }

    #[test]
    fn verdict_precedes_original_body() {
        let (item, verdict) = invoice();
        let report = compose(&item, &verdict);
        let verdict_at = report.body.find(verdict.as_str()).unwrap();
        let body_at = report.body.rfind(&item.body).unwrap();
        assert!(verdict_at < body_at);
    }

    #[test]
    fn absent_subject_yields_bare_prefix() {
        let item = MailItem::new(None, "");
        let report = compose(&item, &Verdict(String::new()));
        assert_eq!(report.subject, SUBJECT_PREFIX);
        assert_eq!(
            report.body,
            format!("{EVALUATION_HEADER}\n{ORIGINAL_HEADER}\n")
        );
    }

    #[test]
    fn compose_is_deterministic() {
        let (item, verdict) = invoice();
        assert_eq!(compose(&item, &verdict), compose(&item, &verdict));
    }

    #[test]
    fn multiline_content_is_kept_verbatim() {
        let item = MailItem::new(Some("Re: Fwd: x".into()), "line 1\r\nline 2\n\n");
        let verdict = Verdict("Not phishing.\nIt is a newsletter.".into());
        let report = compose(&item, &verdict);
        assert!(report.body.contains("Not phishing.\nIt is a newsletter.\n"));
        assert!(report.body.ends_with("line 1\r\nline 2\n\n\n"));
    }
}
