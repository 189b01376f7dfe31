//! FFprobe duration lookup.

use std::path::Path;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::command::{check_ffprobe, run_process};
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Get the total duration of a video in seconds.
///
/// The result is always positive and finite. The child process is killed if
/// `cancel` fires while ffprobe is running.
pub async fn probe_duration(path: impl AsRef<Path>, cancel: &CancellationToken) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = run_process("ffprobe", &args, Some(cancel), None).await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe exited with {}", output.status),
            stderr: Some(output.stderr).filter(|s| !s.is_empty()),
        });
    }

    let duration = parse_duration(&output.stdout)?;
    debug!("Probed {}: {:.3}s", path.display(), duration);
    Ok(duration)
}

/// Extract `format.duration` from ffprobe JSON output.
fn parse_duration(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let raw = probe
        .format
        .duration
        .ok_or_else(|| MediaError::InvalidDuration("ffprobe reported no duration".to_string()))?;

    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MediaError::InvalidDuration(format!("unparsable duration '{}'", raw)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidDuration(format!(
            "duration must be positive, got {}",
            raw
        )));
    }

    Ok(duration)
}
