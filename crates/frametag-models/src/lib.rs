//! Shared data models for the frametag backend.
//!
//! This crate provides Serde-serializable types for:
//! - Provider selection and session identifiers
//! - Sampled keyframes and their wire payloads
//! - Per-frame and overall annotations
//! - Analysis requests, lifecycle state and results

pub mod analysis;
pub mod annotation;
pub mod frame;
pub mod provider;
pub mod session;

// Re-export common types
pub use analysis::{
    validate_frame_count, AnalysisPayload, AnalysisRequest, AnalysisResult, AnalysisState,
    DEFAULT_FRAME_COUNT, MAX_FRAME_COUNT,
};
pub use annotation::{FrameAnnotation, OverallAnnotation};
pub use frame::{frame_file_name, FramePayload, SampledFrame};
pub use provider::{ParseProviderKindError, ProviderKind};
pub use session::SessionId;
