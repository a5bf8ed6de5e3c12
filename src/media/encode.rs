use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::VERSION_PROBE_TIMEOUT;

/// Outcome of one encoder run, produced exactly once per request.
#[derive(Debug)]
pub enum EncodeOutcome {
    Success { path: PathBuf, size_bytes: u64 },
    /// Non-zero exit or spawn failure, with captured diagnostics.
    Failed { diagnostics: String },
    TimedOut,
    /// Zero exit but nothing on disk at the output path.
    OutputMissing,
    /// Output exceeded the size ceiling and was deleted.
    OutputTooLarge { size_bytes: u64 },
}

/// Drives the external ffmpeg binary. The binary path is resolved once at
/// startup and immutable afterwards.
#[derive(Clone)]
pub struct Encoder {
    ffmpeg_path: PathBuf,
    timeout: Duration,
    max_output_bytes: u64,
}

impl Encoder {
    pub fn new(ffmpeg_path: &Path, timeout: Duration, max_output_bytes: u64) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_path_buf(),
            timeout,
            max_output_bytes,
        }
    }

    pub fn is_available(&self) -> bool {
        self.ffmpeg_path.is_file()
    }

    /// Loops the still image over the audio track into one mp4. The
    /// `-shortest` flag truncates the infinite image loop to the audio's
    /// duration.
    pub async fn encode(&self, image: &Path, audio: &Path, output: &Path) -> EncodeOutcome {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-loop")
            .arg("1")
            .arg("-i")
            .arg(image)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "libx264", "-tune", "stillimage"])
            .args(["-c:a", "aac", "-b:a", "192k"])
            .args(["-pix_fmt", "yuv420p", "-shortest", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::info!(
            "encoding {} + {} -> {}",
            image.display(),
            audio.display(),
            output.display()
        );

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return EncodeOutcome::Failed {
                    diagnostics: format!(
                        "failed to spawn {}: {}",
                        self.ffmpeg_path.display(),
                        e
                    ),
                };
            }
        };

        let out = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                return EncodeOutcome::Failed {
                    diagnostics: e.to_string(),
                };
            }
            Err(_) => {
                // Dropping the wait future drops the child; kill_on_drop
                // terminates and reaps it, so no encoder keeps running
                // past the budget.
                return EncodeOutcome::TimedOut;
            }
        };

        if !out.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&out.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = String::from_utf8_lossy(&out.stdout).into_owned();
            }
            return EncodeOutcome::Failed { diagnostics };
        }

        let size_bytes = match tokio::fs::metadata(output).await {
            Ok(meta) => meta.len(),
            Err(_) => return EncodeOutcome::OutputMissing,
        };
        if size_bytes > self.max_output_bytes {
            if let Err(e) = tokio::fs::remove_file(output).await {
                log::warn!("failed to remove oversized output {}: {}", output.display(), e);
            }
            return EncodeOutcome::OutputTooLarge { size_bytes };
        }

        EncodeOutcome::Success {
            path: output.to_path_buf(),
            size_bytes,
        }
    }

    /// Runs `ffmpeg -version` and returns the first line of its output.
    pub async fn version(&self) -> anyhow::Result<String> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-version").stdin(Stdio::null());
        let output = tokio::time::timeout(VERSION_PROBE_TIMEOUT, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("version probe timed out"))??;
        if !output.status.success() {
            anyhow::bail!(
                "{} -version exited with {}",
                self.ffmpeg_path.display(),
                output.status
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
