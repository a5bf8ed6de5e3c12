use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::api::AppState;
use crate::handler::{ApiError, ApiResult};
use crate::media::artifact::{self, Role};
use crate::media::encode::EncodeOutcome;
use crate::media::resolve::{self, RequestIntent};

pub fn video_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-video", post(create_video))
        .route("/download/{filename}", get(download))
}

#[derive(Deserialize)]
struct CreateVideoRequest {
    audio_url: Option<String>,
    image_url: Option<String>,
    audio_data: Option<String>,
    image_data: Option<String>,
    output_filename: Option<String>,
}

impl CreateVideoRequest {
    /// Fixed precedence when one body carries fields of several shapes:
    /// inline base64 first, then remote URLs. Fields of the losing shape
    /// are ignored.
    fn into_intent(self) -> Result<RequestIntent, ApiError> {
        if self.audio_data.is_some() || self.image_data.is_some() {
            match (self.audio_data, self.image_data) {
                (Some(audio_data), Some(image_data)) => Ok(RequestIntent::Inline {
                    audio_data,
                    image_data,
                    output_filename: self.output_filename,
                }),
                _ => Err(ApiError::BadRequest(
                    "audio_data and image_data are required".to_string(),
                )),
            }
        } else if self.audio_url.is_some() || self.image_url.is_some() {
            match (self.audio_url, self.image_url) {
                (Some(audio_url), Some(image_url)) => Ok(RequestIntent::Remote {
                    audio_url,
                    image_url,
                    output_filename: self.output_filename,
                }),
                _ => Err(ApiError::BadRequest(
                    "audio_url and image_url are required".to_string(),
                )),
            }
        } else {
            Err(ApiError::BadRequest(
                "no recognized input: provide audio_data/image_data, audio_url/image_url, or multipart files"
                    .to_string(),
            ))
        }
    }
}

#[derive(Deserialize)]
struct DeliveryQuery {
    delivery: Option<String>,
}

enum Delivery {
    /// JSON descriptor pointing at /download/{name}; output stays on disk.
    Reference,
    /// The mp4 bytes in the response body; output removed before replying.
    Stream,
}

impl DeliveryQuery {
    fn mode(&self) -> Result<Delivery, ApiError> {
        match self.delivery.as_deref() {
            None | Some("reference") => Ok(Delivery::Reference),
            Some("stream") => Ok(Delivery::Stream),
            Some(other) => Err(ApiError::BadRequest(format!(
                "unknown delivery mode: {}",
                other
            ))),
        }
    }
}

async fn create_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeliveryQuery>,
    request: Request,
) -> ApiResult<Response> {
    let delivery = query.mode()?;
    let intent = parse_intent(&state, request).await?;
    run_pipeline(&state, intent, delivery).await
}

/// Transport dispatch: JSON bodies carry the inline or remote-URL shapes,
/// multipart carries the upload shape.
async fn parse_intent(state: &Arc<AppState>, request: Request) -> Result<RequestIntent, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("application/json") {
        let Json(body): Json<CreateVideoRequest> = Json::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
        body.into_intent()
    } else if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?;
        collect_upload(multipart).await
    } else {
        Err(ApiError::BadRequest(
            "expected application/json or multipart/form-data".to_string(),
        ))
    }
}

async fn collect_upload(mut multipart: Multipart) -> Result<RequestIntent, ApiError> {
    let mut audio = None;
    let mut image = None;
    let mut audio_name = None;
    let mut image_name = None;
    let mut output_filename = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                audio_name = field.file_name().map(|s| s.to_string());
                audio = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read audio field: {}", e))
                })?);
            }
            "image" => {
                image_name = field.file_name().map(|s| s.to_string());
                image = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read image field: {}", e))
                })?);
            }
            "output_filename" => {
                output_filename = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read output_filename field: {}", e))
                })?);
            }
            other => {
                log::debug!("ignoring multipart field {:?}", other);
            }
        }
    }

    match (audio, image) {
        (Some(audio), Some(image)) => Ok(RequestIntent::Upload {
            audio,
            image,
            audio_name,
            image_name,
            output_filename,
        }),
        _ => Err(ApiError::BadRequest(
            "audio and image files are required".to_string(),
        )),
    }
}

async fn run_pipeline(
    state: &Arc<AppState>,
    intent: RequestIntent,
    delivery: Delivery,
) -> ApiResult<Response> {
    let request_id = artifact::new_request_id();
    let inputs = resolve::resolve(intent, &state.store, &state.http, &request_id).await?;

    let output_path = state.store.allocate(&request_id, Role::Video, ".mp4");
    let outcome = state
        .encoder
        .encode(&inputs.image.path, &inputs.audio.path, &output_path)
        .await;

    // Inputs are consumed no matter how the encode went.
    state.store.release(&inputs.audio.path).await;
    state.store.release(&inputs.image.path).await;

    let err = match outcome {
        EncodeOutcome::Success { path, size_bytes } => {
            return publish(state, &inputs.output_filename, path, size_bytes, delivery).await;
        }
        EncodeOutcome::Failed { diagnostics } => ApiError::EncoderFailed { diagnostics },
        EncodeOutcome::TimedOut => ApiError::EncodeTimeout,
        EncodeOutcome::OutputMissing => ApiError::OutputMissing,
        EncodeOutcome::OutputTooLarge { size_bytes } => ApiError::OutputTooLarge { size_bytes },
    };
    state.store.release(&output_path).await;
    Err(err)
}

async fn publish(
    state: &Arc<AppState>,
    output_filename: &str,
    path: std::path::PathBuf,
    size_bytes: u64,
    delivery: Delivery,
) -> ApiResult<Response> {
    match delivery {
        Delivery::Reference => {
            let stored_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let video_url = match state.config.public_base_url() {
                Some(base) => format!("{}/download/{}", base, stored_name),
                None => format!("/download/{}", stored_name),
            };
            Ok(Json(json!({
                "message": "Video created successfully",
                "filename": output_filename,
                "video_url": video_url,
                "size": size_bytes,
                "size_mb": (size_bytes as f64) / (1024.0 * 1024.0),
            }))
            .into_response())
        }
        Delivery::Stream => {
            // Bounded by the output size ceiling, so buffering is fine;
            // the artifact is gone before the response leaves the handler.
            let bytes = tokio::fs::read(&path).await?;
            state.store.release(&path).await;
            Ok(attachment_response(output_filename, Body::from(bytes)))
        }
    }
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = state
        .store
        .resolve_download(&filename)
        .ok_or(ApiError::NotFound)?;
    let file = tokio::fs::File::open(&path).await?;
    let stream = ReaderStream::new(file);
    Ok(attachment_response(&filename, Body::from_stream(stream)))
}

fn attachment_response(filename: &str, body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
#[path = "video_test.rs"]
mod video_test;
