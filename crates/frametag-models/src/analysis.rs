//! Analysis workflow data models.
//!
//! One analysis runs per upload:
//! 1. Extract: probe the video and capture evenly spaced keyframes
//! 2. Analyze: send the frames to the selected vision provider
//! 3. Normalize: align the provider output back onto the frame order

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::annotation::{FrameAnnotation, OverallAnnotation};
use crate::frame::{FramePayload, SampledFrame};
use crate::provider::ProviderKind;
use crate::session::SessionId;

/// Frame count used when the client does not ask for one.
pub const DEFAULT_FRAME_COUNT: u32 = 8;

/// Upper bound on frames per request.
pub const MAX_FRAME_COUNT: u32 = 64;

/// Lifecycle of a single analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    /// Request accepted, nothing started
    #[default]
    Created,
    /// Probing duration and capturing frames
    Extracting,
    /// Waiting on the vision provider
    Analyzing,
    /// Parsing and aligning provider output
    Normalizing,
    /// Result assembled
    Completed,
    /// Aborted through the cancellation endpoint
    Cancelled,
    /// Unrecoverable error
    Failed,
}

impl AnalysisState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Analyzing => "analyzing",
            Self::Normalizing => "normalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the status is terminal (completed, cancelled, or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: AnalysisState) -> bool {
        use AnalysisState::*;
        match (self, next) {
            (Created, Extracting)
            | (Extracting, Analyzing)
            | (Analyzing, Normalizing)
            | (Normalizing, Completed) => true,
            (Extracting | Analyzing, Cancelled) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Input for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Uploaded video on local disk
    pub video_path: PathBuf,
    pub frame_count: u32,
    pub provider: ProviderKind,
    pub session_id: SessionId,
}

/// Check a requested frame count against `1..=max_frame_count`.
pub fn validate_frame_count(frame_count: u32, max_frame_count: u32) -> Result<(), String> {
    if frame_count == 0 {
        return Err("numFrames must be a positive integer".to_string());
    }
    if frame_count > max_frame_count {
        return Err(format!(
            "numFrames must be at most {}, got {}",
            max_frame_count, frame_count
        ));
    }
    Ok(())
}

/// Normalized model output for a request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisPayload {
    /// Exactly one entry per sampled frame, in frame order
    pub frames: Vec<FrameAnnotation>,
    /// Whole-video summary; absent for per-frame providers
    pub overall: Option<OverallAnnotation>,
    /// Set when no JSON could be recovered from the provider output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw provider text accompanying `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Response body of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub provider: ProviderKind,
    /// Model identifier actually used
    pub model: String,
    pub session_id: SessionId,
    pub frames: Vec<FramePayload>,
    pub analysis: AnalysisPayload,
}

impl AnalysisResult {
    pub fn new(
        provider: ProviderKind,
        model: impl Into<String>,
        session_id: SessionId,
        frames: &[SampledFrame],
        analysis: AnalysisPayload,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            session_id,
            frames: frames.iter().map(SampledFrame::to_payload).collect(),
            analysis,
        }
    }

    /// Annotation `i` belongs to frame `i` for every `i`.
    pub fn is_aligned(&self) -> bool {
        self.frames.len() == self.analysis.frames.len()
            && self
                .frames
                .iter()
                .zip(&self.analysis.frames)
                .all(|(f, a)| f.index == a.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(n: usize) -> AnalysisResult {
        let frames: Vec<SampledFrame> = (0..n)
            .map(|i| SampledFrame::new(i, i as f64 + 0.5, vec![i as u8; 4]))
            .collect();
        let analysis = AnalysisPayload {
            frames: frames
                .iter()
                .map(|f| FrameAnnotation::empty(f.index, f.timestamp_sec))
                .collect(),
            overall: Some(OverallAnnotation::default()),
            error: None,
            raw: None,
        };
        AnalysisResult::new(
            ProviderKind::Cloud,
            "test-model",
            SessionId::parse("s-1").unwrap(),
            &frames,
            analysis,
        )
    }

    #[test]
    fn test_state_transitions() {
        use AnalysisState::*;
        assert!(Created.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Normalizing));
        assert!(Normalizing.can_transition_to(Completed));

        assert!(Extracting.can_transition_to(Cancelled));
        assert!(Analyzing.can_transition_to(Cancelled));
        assert!(!Created.can_transition_to(Cancelled));
        assert!(!Normalizing.can_transition_to(Cancelled));

        assert!(Created.can_transition_to(Failed));
        assert!(Normalizing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Cancelled.can_transition_to(Failed));

        assert!(!Created.can_transition_to(Analyzing));
        assert!(!Completed.can_transition_to(Extracting));
    }

    #[test]
    fn test_terminal_states() {
        assert!(AnalysisState::Completed.is_terminal());
        assert!(AnalysisState::Cancelled.is_terminal());
        assert!(AnalysisState::Failed.is_terminal());
        assert!(!AnalysisState::Analyzing.is_terminal());
    }

    #[test]
    fn test_frame_count_validation() {
        assert!(validate_frame_count(8, MAX_FRAME_COUNT).is_ok());
        assert!(validate_frame_count(MAX_FRAME_COUNT, MAX_FRAME_COUNT).is_ok());
        assert!(validate_frame_count(0, MAX_FRAME_COUNT).is_err());
        assert!(validate_frame_count(MAX_FRAME_COUNT + 1, MAX_FRAME_COUNT).is_err());
    }

    #[test]
    fn test_result_round_trip_keeps_frame_indices() {
        let result = sample_result(5);
        assert!(result.is_aligned());

        let json = serde_json::to_string(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.frames.len(), 5);
        let indices: Vec<usize> = parsed.frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(parsed.is_aligned());
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_result_wire_shape() {
        let json = serde_json::to_value(sample_result(1)).unwrap();
        assert_eq!(json["provider"], "cloud");
        assert_eq!(json["sessionId"], "s-1");
        assert!(json["analysis"]["overall"].is_object());
        assert!(json["analysis"].get("error").is_none());
    }
}
