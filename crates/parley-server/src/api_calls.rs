//! Call-control webhook handlers.
//!
//! The telephony provider drives the conversation loop: `/voice` fires once
//! when a call is answered, then every finished recording posts to
//! `/process_voice`, whose response document ends with another `<Record>`,
//! repeating until the caller hangs up. Turn failures are spoken back to
//! the caller and re-prompt — the webhook never returns an error status for
//! a failed turn, because the provider would drop the call.

use crate::twiml::{RecordOptions, VoiceResponse};
use crate::AppState;
use axum::{
    extract::{Extension, Form},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Form fields posted by the provider when a recording finishes.
#[derive(Debug, Deserialize)]
pub struct RecordingCallback {
    /// Opaque reference to the stored recording.
    #[serde(rename = "RecordingUrl")]
    pub recording_url: String,

    /// Caller phone number.
    #[serde(rename = "From")]
    pub from: String,

    /// Provider-assigned call identifier.
    #[serde(rename = "CallSid")]
    pub call_sid: String,
}

fn xml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], xml).into_response()
}

fn record_options(state: &AppState) -> RecordOptions {
    RecordOptions {
        action: "/process_voice".to_string(),
        max_length_secs: state.call.record_max_length_secs,
        timeout_secs: state.call.record_timeout_secs,
        play_beep: false,
    }
}

/// Handler for `POST /voice` — the call is answered.
pub async fn answer_call_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    tracing::info!("call answered");

    let doc = VoiceResponse::new()
        .say(&state.call.greeting, &state.call.language)
        .record(&record_options(&state))
        .to_xml();
    xml_response(doc)
}

/// Handler for `POST /process_voice` — one recorded utterance.
pub async fn process_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(callback): Form<RecordingCallback>,
) -> Response {
    tracing::info!(
        caller = %callback.from,
        call_sid = %callback.call_sid,
        recording_url = %callback.recording_url,
        "recording received"
    );

    let doc = match state
        .orchestrator
        .process_turn(&callback.recording_url, &callback.from, &callback.call_sid)
        .await
    {
        Ok(reply) => VoiceResponse::new()
            .play(&reply.audio_url)
            .record(&record_options(&state))
            .to_xml(),
        Err(e) => {
            tracing::error!(
                stage = e.stage(),
                caller = %callback.from,
                call_sid = %callback.call_sid,
                error = %e,
                "turn failed"
            );
            VoiceResponse::new()
                .say(&state.call.failure_message, &state.call.language)
                .record(&record_options(&state))
                .to_xml()
        }
    };

    xml_response(doc)
}
