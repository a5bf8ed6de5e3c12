use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-fetch budget for remote input downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Wall-clock budget for one encoder run.
pub const ENCODE_TIMEOUT: Duration = Duration::from_secs(300);
/// Budget for the `-version` probe behind /test-encoder.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_MAX_OUTPUT_MB: u64 = 95;

/// Process-wide configuration, resolved once at startup and read-only
/// afterwards.
pub struct AppConfig {
    scratch_dir: PathBuf,
    port: u16,
    public_base_url: Option<String>,
    ffmpeg_path: PathBuf,
    max_output_bytes: u64,
}

impl AppConfig {
    pub fn new(
        scratch_dir: PathBuf,
        port: u16,
        public_base_url: Option<String>,
        ffmpeg_path: PathBuf,
        max_output_bytes: u64,
    ) -> Self {
        Self {
            scratch_dir,
            port,
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
            ffmpeg_path,
            max_output_bytes,
        }
    }

    pub fn from_env() -> Self {
        let scratch_dir = env::var("STILLMUX_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("stillmux"));
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let public_base_url = env::var("STILLMUX_PUBLIC_BASE_URL").ok();
        let ffmpeg_path = env::var("FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| resolve_ffmpeg());
        let max_output_bytes = env::var("STILLMUX_MAX_OUTPUT_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_OUTPUT_MB)
            * 1024
            * 1024;
        Self::new(scratch_dir, port, public_base_url, ffmpeg_path, max_output_bytes)
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url.as_deref()
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn max_output_bytes(&self) -> u64 {
        self.max_output_bytes
    }
}

/// Probes each PATH entry for an ffmpeg binary, falling back to the
/// conventional install location. Absence is not fatal here; it only
/// degrades /health until the binary shows up at that path.
fn resolve_ffmpeg() -> PathBuf {
    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            let candidate = dir.join("ffmpeg");
            if candidate.is_file() {
                return candidate;
            }
        }
    }
    PathBuf::from("/usr/local/bin/ffmpeg")
}
