use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub mod system;
pub mod video;

pub type ApiResult<T> = Result<T, ApiError>;

/// Closed set of request-failure kinds. Carried as structured context
/// through the pipeline and formatted to a JSON body only here, at the
/// response boundary.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    DownloadFailed { what: &'static str, detail: String },
    Base64Decode { field: &'static str, detail: String },
    EmptyInput { what: &'static str },
    OutputTooLarge { size_bytes: u64 },
    NotFound,
    Io(std::io::Error),
    EncoderFailed { diagnostics: String },
    OutputMissing,
    DownloadTimeout { what: &'static str },
    EncodeTimeout,
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::DownloadFailed { .. }
            | ApiError::Base64Decode { .. }
            | ApiError::EmptyInput { .. }
            | ApiError::OutputTooLarge { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Io(_)
            | ApiError::EncoderFailed { .. }
            | ApiError::OutputMissing
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DownloadTimeout { .. } | ApiError::EncodeTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::EmptyInput { .. } => "bad_request",
            ApiError::DownloadFailed { .. } => "download_failed",
            ApiError::Base64Decode { .. } => "base64_decode",
            ApiError::OutputTooLarge { .. } => "output_too_large",
            ApiError::NotFound => "not_found",
            ApiError::Io(_) => "io",
            ApiError::EncoderFailed { .. } => "encoder_failed",
            ApiError::OutputMissing => "output_missing",
            ApiError::DownloadTimeout { .. } | ApiError::EncodeTimeout => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::DownloadFailed { what, detail } => {
                format!("Failed to download {}: {}", what, detail)
            }
            ApiError::Base64Decode { field, detail } => {
                format!("Invalid base64 in {}: {}", field, detail)
            }
            ApiError::EmptyInput { what } => format!("{} input is empty", what),
            ApiError::OutputTooLarge { size_bytes } => {
                format!("Output video is {} bytes, exceeding the configured limit", size_bytes)
            }
            ApiError::NotFound => "File not found".to_string(),
            ApiError::Io(e) => format!("I/O error: {}", e),
            ApiError::EncoderFailed { .. } => "FFmpeg failed".to_string(),
            ApiError::OutputMissing => "Video file was not created".to_string(),
            ApiError::DownloadTimeout { what } => format!("Download timeout: {}", what),
            ApiError::EncodeTimeout => "FFmpeg timeout".to_string(),
            ApiError::Internal(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}: {}", self.kind(), self.message());
        }
        let mut body = json!({
            "error": self.message(),
            "kind": self.kind(),
        });
        if let ApiError::EncoderFailed { diagnostics } = &self {
            body["details"] = json!(diagnostics);
        }
        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}
