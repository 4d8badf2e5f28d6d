//! Parley server binary — answers calls and runs the turn pipeline.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, the provider adapter set, and graceful shutdown on
//! SIGTERM/SIGINT.

use parley_agent::{
    BlobArchive, ChatService, RecordingFetcher, SttService, TtsService, TurnOrchestrator,
};
use parley_server::{app, config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (String, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("config.toml".to_string(), "default")
}

#[tokio::main]
async fn main() {
    let (config_path, config_source) = resolve_config_path();

    // Load configuration
    let config = config::load_config(&config_path)
        .expect("failed to load configuration — the server cannot start without provider credentials");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = parley_db::create_pool(
        &config.database.path,
        parley_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = parley_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Construct the adapter set and the orchestrator
    let recordings = RecordingFetcher::new(config.telephony.clone(), config.retry)
        .expect("failed to build recording download client");
    let transcriber = SttService::new(config.transcription.clone())
        .expect("failed to build transcription client");
    let generator =
        ChatService::new(config.chat.clone()).expect("failed to build chat completion client");
    let synthesizer =
        TtsService::new(config.speech.clone()).expect("failed to build speech synthesis client");
    let archive =
        BlobArchive::new(config.archive.clone()).expect("failed to build audio archive client");

    let orchestrator = Arc::new(TurnOrchestrator::new(
        pool,
        Arc::new(recordings),
        Arc::new(transcriber),
        Arc::new(generator),
        Arc::new(synthesizer),
        Arc::new(archive),
        config.agent.clone(),
    ));

    // Build application
    let state = AppState {
        orchestrator,
        call: config.call.clone(),
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting parley server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("parley server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
