//! reelcast-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Ensure the ffmpeg/ffprobe binaries are available.
//! 4. Wire the collaborator clients and the pipeline orchestrator.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use reelcast_core::clients::{DeepgramClient, ForumFetcher, OpenAiScriptGenerator};
use reelcast_core::media::{
    CaptionEngine, DurationProbe, FfProcessor, MediaProcessor, StyleSpec, VideoComposer,
};
use reelcast_core::storage::LocalObjectStore;
use reelcast_core::{
    Collaborators, PipelineOrchestrator, PipelineSettings, TaskTracker, TranscodePool,
};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: REELCAST_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "reelcast-server starting");

    // ── 3. Media binaries ──────────────────────────────────────────────────────
    if cfg.download_ffmpeg {
        tokio::task::spawn_blocking(ffmpeg_sidecar::download::auto_download).await??;
        info!("ffmpeg sidecar ready");
    }

    // ── 4. Pipeline wiring ─────────────────────────────────────────────────────
    if cfg.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; script generation will fail");
    }
    if cfg.deepgram_api_key.is_empty() {
        warn!("DEEPGRAM_API_KEY is not set; speech and transcription will fail");
    }

    let processor: Arc<dyn MediaProcessor> = Arc::new(FfProcessor::new());
    let deepgram = Arc::new(DeepgramClient::new(cfg.deepgram_api_key.clone()));
    let store = Arc::new(LocalObjectStore::new(
        cfg.store_root.clone(),
        cfg.public_base_url.clone(),
    ));

    let orchestrator = PipelineOrchestrator::new(
        TaskTracker::new(),
        TranscodePool::new(cfg.transcode_capacity),
        Collaborators {
            fetcher: Arc::new(ForumFetcher::new()?),
            script: Arc::new(OpenAiScriptGenerator::new(
                cfg.openai_api_key.clone(),
                cfg.openai_model.clone(),
            )),
            speech: Arc::clone(&deepgram) as _,
            store,
        },
        CaptionEngine::new(deepgram, Arc::clone(&processor)),
        VideoComposer::new(Arc::clone(&processor)),
        DurationProbe::new(processor),
        PipelineSettings {
            style: StyleSpec::default(),
            bucket: cfg.media_bucket.clone(),
            background_key: cfg.background_key.clone(),
        },
    );

    // ── 5. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        orchestrator: Arc::new(orchestrator),
    });

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("reelcast-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
