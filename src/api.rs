use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, DOWNLOAD_TIMEOUT, ENCODE_TIMEOUT};
use crate::media::artifact::ArtifactStore;
use crate::media::encode::Encoder;

/// Uploads carry whole media files; axum's 2 MB default is far too small.
const BODY_LIMIT: usize = 200 * 1024 * 1024;

pub struct AppState {
    pub config: AppConfig,
    pub store: ArtifactStore,
    pub encoder: Encoder,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = ArtifactStore::new(config.scratch_dir())?;
        let encoder = Encoder::new(config.ffmpeg_path(), ENCODE_TIMEOUT, config.max_output_bytes());
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            config,
            store,
            encoder,
            http,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(crate::handler::system::system_router())
        .merge(crate::handler::video::video_router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

pub(crate) fn start_api_server(state: Arc<AppState>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let port = state.config.port();
        let app = router(state);

        let listener = TcpListener::bind(("0.0.0.0", port)).await.unwrap();
        println!("API server started on port {}", port);
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(cancel))
            .await
        {
            println!("Error starting API server: {}", e);
        }
    });
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {
            println!("Shutting down API server...");
        }
    }
}
