//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing or capturing frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Unable to determine video duration: {0}")]
    InvalidDuration(String),

    #[error("Failed to capture frame {index}: {source}")]
    CaptureFailed {
        index: usize,
        #[source]
        source: Box<MediaError>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Wrap the cause of a failed capture with the frame index.
    ///
    /// Cancellation is passed through unchanged so callers can tell a user
    /// abort apart from a broken capture.
    pub fn capture_failed(index: usize, source: MediaError) -> Self {
        match source {
            MediaError::Cancelled => MediaError::Cancelled,
            other => Self::CaptureFailed {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }
}
