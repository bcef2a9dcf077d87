/// Tubeclip API Server
///
/// HTTP façade over yt-dlp and ffmpeg: video metadata, full downloads, and
/// trimmed audio segments for the browser front-end.
mod delivery;
mod error;
mod routes;

use anyhow::Context;
use axum::http::header;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use tubeclip_downloader::{MediaTools, ProcessRunner, Tool};
use tubeclip_shared::config::Config;
use tubeclip_shared::temp_storage::{spawn_sweeper, TempStorage};

/// Shared application state for all API handlers.
pub struct AppState {
    pub storage: Arc<TempStorage>,
    pub tools: MediaTools,
}

/// API routes plus the `/temp` mount and the front-end fallback.
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]);

    let temp_files = ServeDir::new(state.storage.path());

    Router::new()
        .route("/api/info", get(routes::get_info))
        .route("/api/download-video", post(routes::download_video))
        .route("/api/download-audio", post(routes::download_audio))
        .route("/api/download-audio-segment", post(routes::download_audio_segment))
        .route("/api/get-audio", post(routes::get_audio))
        .route("/api/health", get(routes::health))
        .nest_service("/temp", temp_files)
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tubeclip_api=info,tubeclip_downloader=info,tubeclip_shared=info,tower_http=info".into()
            }),
        )
        .init();

    let config = Config::from_env().context("reading configuration")?;

    // Temp storage
    let storage = Arc::new(TempStorage::new(config.temp_dir.clone()));
    storage
        .ensure_directory()
        .await
        .with_context(|| format!("creating temp directory {}", config.temp_dir.display()))?;
    info!("Temp directory: {}", config.temp_dir.display());

    // Background sweep of stale temp files
    let sweeper = spawn_sweeper(storage.clone(), config.sweep_interval, config.retention);

    let tools = MediaTools::new(Arc::new(ProcessRunner), &config);
    report_dependencies(&tools).await;

    let state = Arc::new(AppState { storage, tools });
    let app = build_router(state, &config.static_dir);

    // Bind
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("Tubeclip listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    sweeper.abort();
    info!("Tubeclip stopped");
    Ok(())
}

/// Log whether each external tool answers its version check.
async fn report_dependencies(tools: &MediaTools) {
    for tool in [Tool::YtDlp, Tool::Ffmpeg] {
        if tools.probe(tool).await {
            info!("{}: installed ({})", tool, tools.program(tool));
        } else {
            warn!("{}: not found. Install with: {}", tool, tool.install_hint());
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
}
