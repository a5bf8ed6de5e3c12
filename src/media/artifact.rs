use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Role a scratch file plays within one request; rendered as the on-disk
/// path prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Audio,
    Image,
    Video,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Audio => "audio",
            Role::Image => "image",
            Role::Video => "video",
        }
    }
}

/// Freshly generated 128-bit token namespacing every artifact of one
/// request.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A fully written scratch file.
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Shared scratch directory. Safe under concurrency purely through
/// per-request unique naming; no two requests ever address the same path,
/// so no locking is needed.
#[derive(Clone)]
pub struct ArtifactStore {
    scratch_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates the scratch directory if absent.
    pub fn new(scratch_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(scratch_dir)?;
        Ok(Self {
            scratch_dir: scratch_dir.to_path_buf(),
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Deterministic per-request path: `{scratch}/{role}_{request_id}{ext}`.
    pub fn allocate(&self, request_id: &str, role: Role, ext: &str) -> PathBuf {
        self.scratch_dir
            .join(format!("{}_{}{}", role.prefix(), request_id, ext))
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<Artifact> {
        tokio::fs::write(path, bytes).await?;
        Ok(Artifact {
            path: path.to_path_buf(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Best-effort delete. A missing file is fine; anything else is logged
    /// and swallowed so cleanup can never fail a request that already
    /// succeeded.
    pub async fn release(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove {}: {}", path.display(), e),
        }
    }

    /// Maps a client-supplied download name onto an existing scratch file.
    /// Anything that is not a plain file name is rejected outright.
    pub fn resolve_download(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        let path = self.scratch_dir.join(filename);
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
#[path = "artifact_test.rs"]
mod artifact_test;
