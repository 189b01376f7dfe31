//! Per-request scratch space on disk.
//!
//! Each analysis gets an uploaded video file and a private frames directory.
//! Both are removed when the [`SessionWorkspace`] is dropped, whichever way
//! the request ends.

use std::path::{Path, PathBuf};

use frametag_models::SessionId;
use tempfile::{Builder, TempDir, TempPath};
use tracing::debug;

use crate::error::MediaResult;

const UPLOADS_DIR: &str = "uploads";
const FRAMES_DIR: &str = "frames";
const DEFAULT_EXTENSION: &str = "mp4";

/// Temporary files owned by one analysis request.
#[derive(Debug)]
pub struct SessionWorkspace {
    upload: TempPath,
    frames: TempDir,
}

impl SessionWorkspace {
    /// Store `bytes` as the uploaded video under `root` and create a fresh
    /// frames directory for `session`.
    pub async fn create(
        root: &Path,
        session: &SessionId,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> MediaResult<Self> {
        let uploads = root.join(UPLOADS_DIR);
        let frames_root = root.join(FRAMES_DIR);
        tokio::fs::create_dir_all(&uploads).await?;
        tokio::fs::create_dir_all(&frames_root).await?;

        let suffix = format!(".{}", upload_extension(original_name));
        let upload = Builder::new()
            .prefix(&uuid::Uuid::new_v4().to_string())
            .suffix(&suffix)
            .rand_bytes(0)
            .tempfile_in(&uploads)?
            .into_temp_path();
        tokio::fs::write(&upload, bytes).await?;

        let frames = Builder::new()
            .prefix(&format!("{}-", sanitize_session(session.as_str())))
            .tempdir_in(&frames_root)?;

        debug!(
            session_id = %session,
            upload = %upload.display(),
            frames_dir = %frames.path().display(),
            "Created session workspace"
        );

        Ok(Self { upload, frames })
    }

    pub fn video_path(&self) -> &Path {
        &self.upload
    }

    pub fn frames_dir(&self) -> &Path {
        self.frames.path()
    }
}

impl Drop for SessionWorkspace {
    fn drop(&mut self) {
        debug!(
            upload = %self.upload.display(),
            frames_dir = %self.frames.path().display(),
            "Removing session workspace"
        );
    }
}

/// Keep a short alphanumeric extension from the client file name.
fn upload_extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Session ids come from clients; keep them path-safe.
fn sanitize_session(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}

/// Count entries directly under `dir`, treating a missing directory as empty.
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

/// Paths created under a workspace root.
pub fn workspace_dirs(root: &Path) -> (PathBuf, PathBuf) {
    (root.join(UPLOADS_DIR), root.join(FRAMES_DIR))
}
