// HTTP surface: one page plus a JSON API over the session actions

mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::downloader::backends::YtDlpBackend;
use crate::downloader::tools::probe_tool;
use crate::downloader::{Downloader, MediaBackend};
use crate::session::SessionStore;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub downloader: Arc<Downloader>,
    pub work_dir: PathBuf,
    pub extract_timeout: u64,
    pub ytdlp_path: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, backend: Arc<dyn MediaBackend>) -> Self {
        let work_dir = config.work_dir();
        Self {
            sessions: SessionStore::new(config.session_ttl()),
            downloader: Arc::new(Downloader::new(backend, work_dir.clone())),
            work_dir,
            extract_timeout: config.extract_timeout,
            ytdlp_path: config.ytdlp_path(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route(
            "/api/session",
            post(routes::create_session).delete(routes::end_session),
        )
        .route("/api/state", get(routes::get_state))
        .route(
            "/api/cookie",
            post(routes::upload_cookie).delete(routes::clear_cookie),
        )
        .route("/api/parse", post(routes::parse))
        .route("/api/selection", post(routes::select))
        .route("/api/download", post(routes::download))
        .route("/api/progress", get(routes::progress))
        .route("/api/file", get(routes::file))
        .route("/api/tools", get(routes::tools))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// End idle sessions on a timer
pub fn spawn_session_sweeper(sessions: SessionStore) -> tokio::task::JoinHandle<()> {
    let period = sessions.ttl().min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            sessions.sweep_expired(Instant::now());
        }
    })
}

pub async fn serve(config: Config) -> Result<()> {
    let ytdlp = YtDlpBackend::with_path(config.ytdlp_path());
    let tool = probe_tool("yt-dlp", ytdlp.path()).await;
    if tool.is_available {
        info!(path = %tool.path, version = ?tool.version, "Found yt-dlp");
    } else {
        warn!(path = %tool.path, "yt-dlp is not runnable; format discovery will fail");
    }

    let state = AppState::new(&config, Arc::new(ytdlp));
    spawn_session_sweeper(state.sessions.clone());

    let listener = TcpListener::bind(config.listen).await?;
    info!(addr = %listener.local_addr()?, work_dir = %state.work_dir.display(), "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
