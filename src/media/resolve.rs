use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use crate::handler::ApiError;
use crate::media::artifact::{Artifact, ArtifactStore, Role};

pub const DEFAULT_OUTPUT_FILENAME: &str = "output_video.mp4";

/// One of the three mutually-exclusive input transports a request may use.
pub enum RequestIntent {
    Inline {
        audio_data: String,
        image_data: String,
        output_filename: Option<String>,
    },
    Remote {
        audio_url: String,
        image_url: String,
        output_filename: Option<String>,
    },
    Upload {
        audio: Bytes,
        image: Bytes,
        audio_name: Option<String>,
        image_name: Option<String>,
        output_filename: Option<String>,
    },
}

/// The uniform result all three shapes normalize into: two populated
/// scratch files plus the requested download name.
#[derive(Debug)]
pub struct ResolvedInputs {
    pub audio: Artifact,
    pub image: Artifact,
    pub output_filename: String,
}

pub async fn resolve(
    intent: RequestIntent,
    store: &ArtifactStore,
    client: &reqwest::Client,
    request_id: &str,
) -> Result<ResolvedInputs, ApiError> {
    match intent {
        RequestIntent::Inline {
            audio_data,
            image_data,
            output_filename,
        } => resolve_inline(store, request_id, &audio_data, &image_data, output_filename).await,
        RequestIntent::Remote {
            audio_url,
            image_url,
            output_filename,
        } => resolve_remote(store, client, request_id, &audio_url, &image_url, output_filename).await,
        RequestIntent::Upload {
            audio,
            image,
            audio_name,
            image_name,
            output_filename,
        } => {
            resolve_upload(store, request_id, audio, image, audio_name, image_name, output_filename)
                .await
        }
    }
}

async fn resolve_inline(
    store: &ArtifactStore,
    request_id: &str,
    audio_data: &str,
    image_data: &str,
    output_filename: Option<String>,
) -> Result<ResolvedInputs, ApiError> {
    let output_filename = output_name(output_filename)?;

    // Decode both payloads before writing either, so a bad second field
    // never leaves a half-written request on disk.
    let audio_bytes = decode_base64_field("audio_data", audio_data)?;
    let image_bytes = decode_base64_field("image_data", image_data)?;

    let audio_path = store.allocate(request_id, Role::Audio, ".mp3");
    let image_path = store.allocate(request_id, Role::Image, ".jpg");

    let audio = match store.write(&audio_path, &audio_bytes).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };
    let image = match store.write(&image_path, &image_bytes).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&image_path).await;
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };

    Ok(ResolvedInputs {
        audio,
        image,
        output_filename,
    })
}

async fn resolve_remote(
    store: &ArtifactStore,
    client: &reqwest::Client,
    request_id: &str,
    audio_url: &str,
    image_url: &str,
    output_filename: Option<String>,
) -> Result<ResolvedInputs, ApiError> {
    let output_filename = output_name(output_filename)?;

    let audio_path = store.allocate(request_id, Role::Audio, ".mp3");
    let image_path = store.allocate(request_id, Role::Image, ".jpg");

    // Audio first. If it fails there is nothing on disk yet.
    let audio_bytes = fetch(client, "audio", audio_url).await?;
    let audio = match store.write(&audio_path, &audio_bytes).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };

    // The audio artifact is already on disk here; a failed image fetch
    // must not leak it.
    let image_bytes = match fetch(client, "image", image_url).await {
        Ok(b) => b,
        Err(e) => {
            store.release(&audio_path).await;
            return Err(e);
        }
    };
    let image = match store.write(&image_path, &image_bytes).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&image_path).await;
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };

    Ok(ResolvedInputs {
        audio,
        image,
        output_filename,
    })
}

async fn resolve_upload(
    store: &ArtifactStore,
    request_id: &str,
    audio: Bytes,
    image: Bytes,
    audio_name: Option<String>,
    image_name: Option<String>,
    output_filename: Option<String>,
) -> Result<ResolvedInputs, ApiError> {
    let output_filename = output_name(output_filename)?;

    if audio.is_empty() {
        return Err(ApiError::EmptyInput { what: "audio" });
    }
    if image.is_empty() {
        return Err(ApiError::EmptyInput { what: "image" });
    }

    let audio_path = store.allocate(
        request_id,
        Role::Audio,
        &name_extension(audio_name.as_deref(), ".mp3"),
    );
    let image_path = store.allocate(
        request_id,
        Role::Image,
        &name_extension(image_name.as_deref(), ".jpg"),
    );

    let audio = match store.write(&audio_path, &audio).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };
    let image = match store.write(&image_path, &image).await {
        Ok(a) => a,
        Err(e) => {
            store.release(&image_path).await;
            store.release(&audio_path).await;
            return Err(e.into());
        }
    };

    Ok(ResolvedInputs {
        audio,
        image,
        output_filename,
    })
}

async fn fetch(
    client: &reqwest::Client,
    what: &'static str,
    url: &str,
) -> Result<Bytes, ApiError> {
    log::info!("downloading {} from {}", what, url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(what, e))?
        .error_for_status()
        .map_err(|e| download_error(what, e))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(what, e))?;
    if bytes.is_empty() {
        return Err(ApiError::EmptyInput { what });
    }
    Ok(bytes)
}

fn download_error(what: &'static str, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::DownloadTimeout { what }
    } else {
        ApiError::DownloadFailed {
            what,
            detail: e.to_string(),
        }
    }
}

fn decode_base64_field(field: &'static str, value: &str) -> Result<Vec<u8>, ApiError> {
    let raw = strip_base64_envelope(value).trim();
    let bytes = BASE64.decode(raw).map_err(|e| ApiError::Base64Decode {
        field,
        detail: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(ApiError::EmptyInput { what: field });
    }
    Ok(bytes)
}

/// Accepts both bare base64 and `data:audio/mpeg;base64,...` style
/// envelopes.
fn strip_base64_envelope(value: &str) -> &str {
    match value.find(";base64,") {
        Some(idx) => &value[idx + ";base64,".len()..],
        None => value,
    }
}

/// Strips directory components, traversal sequences and control
/// characters from a client-supplied name. The result is only ever used
/// as a download name or to pick an extension, never as an on-disk path.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .replace("..", "")
}

/// Extension of the sanitized client filename, or the role default.
fn name_extension(name: Option<&str>, default: &'static str) -> String {
    let Some(name) = name else {
        return default.to_string();
    };
    let clean = sanitize_filename(name);
    match clean.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => default.to_string(),
    }
}

fn output_name(requested: Option<String>) -> Result<String, ApiError> {
    match requested {
        None => Ok(DEFAULT_OUTPUT_FILENAME.to_string()),
        Some(name) => {
            let clean = sanitize_filename(&name);
            if clean.is_empty() {
                return Err(ApiError::BadRequest("output_filename is empty".to_string()));
            }
            Ok(clean)
        }
    }
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod resolve_test;
