//! bgm-scene - Story soundscape orchestration service
//!
//! Decomposes story text into cues, drives batched generation through the
//! external audio backend, tracks each cue's lifecycle, and requests the
//! final master mix. Serves a REST API plus an SSE event stream.

use anyhow::{Context, Result};
use bgm_common::events::EventBus;
use bgm_scene::config::{resolve_settings, CliOverrides};
use bgm_scene::services::{HttpRecordSink, HttpSceneBackend, RecordSink, SceneBackend};
use bgm_scene::{AppState, EVENT_BUS_CAPACITY};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "bgm-scene")]
#[command(about = "Story soundscape cue orchestration service")]
#[command(version)]
struct Args {
    /// HTTP server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Base URL of the generation/mix backend
    #[arg(long)]
    backend_url: Option<String>,

    /// Endpoint receiving evaluation records
    #[arg(long)]
    record_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = bgm_common::config::load_or_default(args.config.as_deref(), "bgm-scene")
        .context("Failed to load configuration")?;

    init_tracing(&toml_config.logging)?;

    info!("Starting bgm-scene v{}", env!("CARGO_PKG_VERSION"));

    let settings = resolve_settings(
        &CliOverrides {
            port: args.port,
            backend_url: args.backend_url,
            record_url: args.record_url,
        },
        &toml_config,
    )
    .context("Failed to resolve settings")?;

    info!(
        backend_url = %settings.backend_url,
        timeout_secs = settings.request_timeout.as_secs(),
        words_per_second = settings.words_per_second,
        "Collaborator configured"
    );

    let backend: Arc<dyn SceneBackend> = Arc::new(
        HttpSceneBackend::new(settings.backend_url.clone(), settings.request_timeout)
            .context("Failed to create backend client")?,
    );
    let record_sink: Option<Arc<dyn RecordSink>> = match &settings.record_url {
        Some(url) => Some(Arc::new(
            HttpRecordSink::new(url.clone(), settings.request_timeout)
                .context("Failed to create record sink client")?,
        )),
        None => None,
    };

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let state = AppState::new(backend, record_sink, event_bus, settings.words_per_second);
    let app = bgm_scene::build_router(state);

    let addr = format!("127.0.0.1:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured level; a configured file replaces stderr
fn init_tracing(logging: &bgm_common::config::LoggingConfig) -> Result<()> {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bgm_scene={level},bgm_common={level},tower_http={level}"
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
