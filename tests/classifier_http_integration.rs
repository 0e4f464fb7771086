//! Integration tests for the classification HTTP client and the full pipeline.
//!
//! Each test spins up an Axum server on a random port that stands in for the
//! OpenAI-compatible completions endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use phish_triage::channels::{DeliveryOutcome, MailItem, MailSource, OutboundReport, ReportSink};
use phish_triage::config::LlmConfig;
use phish_triage::error::{LlmError, MailboxError};
use phish_triage::llm::{ChatMessage, CompletionRequest, LlmProvider, OpenAiCompatProvider};
use phish_triage::pipeline::{PhishingClassifier, TriagePipeline};

/// Captured (authorization header, JSON body) pairs.
type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn start_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

fn provider(base: &str) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(&LlmConfig {
        api_base: base.to_string(),
        api_key: secrecy::SecretString::from("pplx-test-key"),
        model: "sonar-test".to_string(),
    })
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![
        ChatMessage::system("system text"),
        ChatMessage::user("user text"),
    ])
}

/// Server that records requests and answers with a fixed completion.
async fn start_completion_server(reply: &'static str) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));

    async fn handler(
        State((captured, reply)): State<(Captured, &'static str)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured.lock().unwrap().push((auth, body));
        Json(json!({
            "id": "cmpl-1",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": reply},
                    "finish_reason": "stop"
                },
                {
                    "index": 1,
                    "message": {"role": "assistant", "content": "second candidate"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
        }))
    }

    let app = Router::new()
        .route("/chat/completions", post(handler))
        .with_state((Arc::clone(&captured), reply));
    (start_server(app).await, captured)
}

async fn start_status_server(
    status: StatusCode,
    headers: &'static [(&'static str, &'static str)],
    body: &'static str,
) -> String {
    let app = Router::new().route(
        "/chat/completions",
        post(move || async move {
            let mut map = HeaderMap::new();
            for (k, v) in headers {
                map.insert(*k, v.parse().unwrap());
            }
            (status, map, body.to_string()).into_response()
        }),
    );
    start_server(app).await
}

// ── Provider ────────────────────────────────────────────────────────

#[tokio::test]
async fn completion_returns_first_choice_and_sends_expected_request() {
    let (base, captured) = start_completion_server("Looks like phishing.").await;

    let response = provider(&base).complete(request()).await.unwrap();
    assert_eq!(response.content, "Looks like phishing.");
    assert_eq!(response.input_tokens, 42);
    assert_eq!(response.output_tokens, 7);

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let (auth, body) = &captured[0];
    assert_eq!(auth.as_deref(), Some("Bearer pplx-test-key"));
    assert_eq!(body["model"], "sonar-test");
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "system text"},
            {"role": "user", "content": "user text"}
        ])
    );
}

#[tokio::test]
async fn unauthorized_is_auth_failure() {
    let base = start_status_server(
        StatusCode::UNAUTHORIZED,
        &[],
        r#"{"error":{"message":"bad key"}}"#,
    )
    .await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::AuthFailed { .. }));
}

#[tokio::test]
async fn too_many_requests_is_rate_limited_without_retry() {
    let base =
        start_status_server(StatusCode::TOO_MANY_REQUESTS, &[("retry-after", "5")], "").await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    match err {
        LlmError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_carries_api_message() {
    let base = start_status_server(
        StatusCode::INTERNAL_SERVER_ERROR,
        &[("content-type", "application/json")],
        r#"{"error":{"message":"model overloaded"}}"#,
    )
    .await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    match err {
        LlmError::RequestFailed { reason, .. } => assert!(reason.contains("model overloaded")),
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn no_choices_is_empty_response() {
    let base = start_status_server(
        StatusCode::OK,
        &[("content-type", "application/json")],
        r#"{"id":"x","choices":[]}"#,
    )
    .await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
}

#[tokio::test]
async fn null_content_is_empty_response() {
    let base = start_status_server(
        StatusCode::OK,
        &[("content-type", "application/json")],
        r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"stop"}]}"#,
    )
    .await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let base = start_status_server(StatusCode::OK, &[], "this is not json").await;
    let err = provider(&base).complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse { .. }));
}

// ── Full pipeline ───────────────────────────────────────────────────

struct FixedSource(Vec<MailItem>);

#[async_trait]
impl MailSource for FixedSource {
    async fn fetch_unread(&self) -> Result<Vec<MailItem>, MailboxError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<OutboundReport>>);

#[async_trait]
impl ReportSink for RecordingSink {
    async fn send(&self, report: &OutboundReport) -> DeliveryOutcome {
        self.0.lock().unwrap().push(report.clone());
        DeliveryOutcome::Delivered
    }
}

#[tokio::test]
async fn pipeline_relays_verdict_to_reviewer() {
    let verdict = "This appears to be phishing due to urgency and an unsolicited payment link.";
    let (base, captured) = start_completion_server(verdict).await;

    let sink = Arc::new(RecordingSink::default());
    let pipeline = TriagePipeline::new(
        Arc::new(FixedSource(vec![MailItem::new(
            Some("Invoice Due".into()),
            "Please pay now via link X",
        )])),
        PhishingClassifier::new(Arc::new(provider(&base))),
        sink.clone(),
    );
    pipeline.run().await.unwrap();

    let sent = sink.0.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Phishing evaluation for: Invoice Due");
    assert_eq!(
        sent[0].body,
        format!(
            "The evaluation of the phishing status is:\n{verdict}\n\
             The initial email was:\nPlease pay now via link X\n"
        )
    );

    let captured = captured.lock().unwrap();
    let user = captured[0].1["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("The Subject is: Invoice Due"));
    assert!(user.contains("The Mail is: Please pay now via link X"));
}

#[tokio::test]
async fn pipeline_with_unreachable_classifier_sends_nothing() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let sink = Arc::new(RecordingSink::default());
    let pipeline = TriagePipeline::new(
        Arc::new(FixedSource(vec![MailItem::new(Some("x".into()), "y")])),
        PhishingClassifier::new(Arc::new(provider(&format!("http://127.0.0.1:{port}")))),
        sink.clone(),
    );

    assert!(pipeline.run().await.is_err());
    assert!(sink.0.lock().unwrap().is_empty());
}
