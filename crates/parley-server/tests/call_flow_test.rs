//! Webhook behavior: answer, process a turn, and speak failures back.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use parley_agent::{
    AgentConfig, ArchiveError, AudioArchive, FetchError, GenerationError, RecordingSource,
    ReplyGenerator, SpeechSynthesizer, SynthesisError, Transcriber, TranscriptionError,
    TurnOrchestrator,
};
use parley_conversation::turn_count;
use parley_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use parley_server::config::CallConfig;
use parley_server::{app, AppState};
use parley_types::ChatMessage;
use tower::ServiceExt;

struct FakeRecordings;

#[async_trait]
impl RecordingSource for FakeRecordings {
    async fn fetch(&self, _recording_url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(vec![1, 2, 3])
    }
}

struct FakeTranscriber {
    fail: bool,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, TranscriptionError> {
        if self.fail {
            return Err(TranscriptionError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok("¿Sigue disponible la casa?".to_string())
    }
}

struct FakeGenerator;

#[async_trait]
impl ReplyGenerator for FakeGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, GenerationError> {
        Ok("Sí, está disponible.".to_string())
    }
}

struct FakeSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        Ok(vec![4, 5, 6])
    }
}

struct FakeArchive;

#[async_trait]
impl AudioArchive for FakeArchive {
    async fn store(&self, _audio: Vec<u8>, name: &str) -> Result<String, ArchiveError> {
        Ok(format!(
            "https://acct.blob.core.windows.net/temp-container/{name}?sig=test"
        ))
    }
}

fn test_state(transcription_fails: bool) -> (AppState, DbPool) {
    let pool = create_pool(
        ":memory:",
        DbRuntimeSettings {
            busy_timeout_ms: 5_000,
            pool_max_size: 1,
        },
    )
    .expect("failed to create pool");
    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
    }

    let orchestrator = Arc::new(TurnOrchestrator::new(
        pool.clone(),
        Arc::new(FakeRecordings),
        Arc::new(FakeTranscriber {
            fail: transcription_fails,
        }),
        Arc::new(FakeGenerator),
        Arc::new(FakeSynthesizer),
        Arc::new(FakeArchive),
        AgentConfig::default(),
    ));

    (
        AppState {
            orchestrator,
            call: CallConfig::default(),
        },
        pool,
    )
}

fn recording_callback_body() -> Body {
    Body::from(
        "RecordingUrl=https%3A%2F%2Fapi.twilio.com%2F2010-04-01%2FAccounts%2FAC1%2FRecordings%2FRE1\
         &From=%2B15550001&CallSid=CA1",
    )
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (state, _pool) = test_state(false);
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn answered_call_greets_and_records() {
    let (state, _pool) = test_state(false);
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/xml",
        "response document must be TwiML"
    );

    let xml = body_text(response).await;
    assert!(xml.contains("<Say language=\"es-mx\">Hola, ¿cómo puedo ayudarte?</Say>"));
    assert!(xml.contains("<Record action=\"/process_voice\""));
    assert!(xml.contains("playBeep=\"false\""));
}

#[tokio::test]
async fn processed_turn_plays_archived_reply_and_keeps_recording() {
    let (state, pool) = test_state(false);
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/process_voice")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(recording_callback_body())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(
        xml.contains("<Play>https://acct.blob.core.windows.net/temp-container/+15550001/audio-"),
        "reply audio must be played back: {xml}"
    );
    assert!(xml.contains("<Record action=\"/process_voice\""), "loop must continue");

    let conn = pool.get().unwrap();
    assert_eq!(turn_count(&conn, "+15550001").unwrap(), 2);
}

#[tokio::test]
async fn failed_turn_speaks_failure_and_reprompts() {
    let (state, pool) = test_state(true);
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/process_voice")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(recording_callback_body())
                .unwrap(),
        )
        .await
        .unwrap();

    // A failed turn is spoken to the caller, never surfaced as an HTTP
    // error — the provider would drop the call.
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("Lo siento"), "failure message must be spoken: {xml}");
    assert!(xml.contains("<Record action=\"/process_voice\""), "caller can retry by speaking");

    let conn = pool.get().unwrap();
    assert_eq!(
        turn_count(&conn, "+15550001").unwrap(),
        0,
        "transcription failure must not log a partial turn"
    );
}
