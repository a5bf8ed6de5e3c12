use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::api::AppState;

pub fn system_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/test-encoder", get(test_encoder))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Video Creation API",
        "endpoints": {
            "/create-video": "POST - Create video from image + audio (JSON urls, JSON base64 or multipart upload)",
            "/download/{filename}": "GET - Download a previously created video",
            "/test-encoder": "GET - Report the encoder version",
            "/health": "GET - Health check"
        }
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    if state.encoder.is_available() {
        (StatusCode::OK, Json(json!({"status": "healthy"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded"})),
        )
            .into_response()
    }
}

async fn test_encoder(State(state): State<Arc<AppState>>) -> Response {
    if !state.encoder.is_available() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "encoder binary not found"})),
        )
            .into_response();
    }
    match state.encoder.version().await {
        Ok(version) => Json(json!({"version": version})).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
