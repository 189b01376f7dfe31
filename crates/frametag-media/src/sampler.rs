//! Midpoint keyframe sampling.
//!
//! The video is split into N equal segments and one frame is captured at the
//! centre of each: `t_i = D * (i + 0.5) / N`. This never lands on the very
//! first or last frame.

use std::path::Path;
use std::time::Duration;

use frametag_models::{frame_file_name, SampledFrame};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Frame capture settings.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Output width in pixels; height keeps the aspect ratio
    pub output_width: u32,
    /// FFmpeg `-q:v` scale (2 = best)
    pub jpeg_quality: u8,
    /// Upper bound for a single capture
    pub capture_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            output_width: 768,
            jpeg_quality: 2,
            capture_timeout: Duration::from_secs(120),
        }
    }
}

impl SamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_width: std::env::var("OUTPUT_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(768),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            capture_timeout: Duration::from_secs(
                std::env::var("CAPTURE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

/// Compute `count` midpoint timestamps over `duration` seconds.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| duration * ((i as f64 + 0.5) / count as f64))
        .collect()
}

/// Captures keyframes one at a time with FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// FFmpeg invocation for one frame at `timestamp`.
    pub fn capture_command(&self, video: &Path, output: &Path, timestamp: f64) -> FfmpegCommand {
        FfmpegCommand::new(video, output)
            .seek(timestamp)
            .single_frame()
            .quality(self.config.jpeg_quality)
            .video_filter(format!("scale={}:-2", self.config.output_width))
            .log_level("error")
    }

    /// Capture one frame per timestamp into `out_dir`, strictly in order.
    ///
    /// The first failing capture aborts the whole batch with
    /// [`MediaError::CaptureFailed`]; no partial list is returned.
    pub async fn capture_frames(
        &self,
        video: &Path,
        out_dir: &Path,
        timestamps: &[f64],
        cancel: &CancellationToken,
    ) -> MediaResult<Vec<SampledFrame>> {
        let runner = FfmpegRunner::new()
            .with_cancel(cancel.clone())
            .with_timeout(self.config.capture_timeout);

        let mut frames = Vec::with_capacity(timestamps.len());

        for (index, &timestamp) in timestamps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(MediaError::Cancelled);
            }

            let output = out_dir.join(frame_file_name(index));
            let cmd = self.capture_command(video, &output, timestamp);

            runner
                .run(&cmd)
                .await
                .map_err(|e| MediaError::capture_failed(index, e))?;

            let image = tokio::fs::read(cmd.output_path())
                .await
                .map_err(|e| MediaError::capture_failed(index, e.into()))?;

            if image.is_empty() {
                return Err(MediaError::capture_failed(
                    index,
                    MediaError::internal("ffmpeg produced an empty image"),
                ));
            }

            debug!(
                frame_index = index,
                timestamp_sec = timestamp,
                bytes = image.len(),
                "Captured frame"
            );
            frames.push(SampledFrame::new(index, timestamp, image));
        }

        info!("Captured {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}
