#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for keyframe extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Duration probing through ffprobe
//! - Midpoint frame sampling with cancellation and per-capture timeouts
//! - Per-request scratch directories that clean up on drop

pub mod command;
pub mod error;
pub mod probe;
pub mod sampler;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, run_process, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use sampler::{sample_timestamps, FrameSampler, SamplerConfig};
pub use workspace::SessionWorkspace;
