//! FFmpeg command builder and cancellable process runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input, so ffmpeg seeks on the demuxer).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.6}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Set JPEG quality scale (2 is best, 31 is worst).
    pub fn quality(self, q: u8) -> Self {
        self.output_arg("-q:v").output_arg(q.to_string())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Where the encoded frame is written.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with cancellation and timeout.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    /// Cancellation signal
    cancel: Option<CancellationToken>,
    /// Per-process timeout
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let output = run_process("ffmpeg", &args, self.cancel.as_ref(), self.timeout).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(output.stderr).filter(|s| !s.is_empty()),
                output.status.code(),
            ))
        }
    }
}

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Spawn `program` and wait for it, killing the child if `cancel` fires or
/// `timeout` elapses first.
pub async fn run_process(
    program: &str,
    args: &[String],
    cancel: Option<&CancellationToken>,
    timeout: Option<Duration>,
) -> MediaResult<ProcessOutput> {
    if cancel.is_some_and(|c| c.is_cancelled()) {
        return Err(MediaError::Cancelled);
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::internal("stdout not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("stderr not captured"))?;

    let stdout_handle = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        buf
    });
    let stderr_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };
    let timed_out = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        status = child.wait() => WaitOutcome::Exited(status),
        _ = cancelled => WaitOutcome::Cancelled,
        _ = timed_out => WaitOutcome::TimedOut,
    };

    let status = match outcome {
        WaitOutcome::Exited(status) => status?,
        WaitOutcome::Cancelled => {
            info!("{} cancelled, killing process", program);
            let _ = child.kill().await;
            return Err(MediaError::Cancelled);
        }
        WaitOutcome::TimedOut => {
            let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
            warn!("{} timed out after {} seconds, killing process", program, secs);
            let _ = child.kill().await;
            return Err(MediaError::Timeout(secs));
        }
    };

    let stdout = stdout_handle.await.unwrap_or_default();
    let stderr = stderr_handle.await.unwrap_or_default();

    Ok(ProcessOutput {
        status,
        stdout,
        stderr: stderr.trim().to_string(),
    })
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
