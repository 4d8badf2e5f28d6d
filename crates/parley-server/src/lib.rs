//! Parley server library logic.

pub mod api_calls;
pub mod config;
pub mod twiml;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::CallConfig;
use parley_agent::TurnOrchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Maximum request body size (64 KiB). Webhook form posts are tiny; the
/// recording itself arrives by reference, never in the body.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
pub struct AppState {
    /// The turn pipeline with its injected adapters; the conversation
    /// store is reached through it.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Call-flow wording and recording parameters.
    pub call: CallConfig,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/voice", post(api_calls::answer_call_handler))
        .route("/process_voice", post(api_calls::process_voice_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
