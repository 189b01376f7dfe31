//! Orchestration errors.

use frametag_media::MediaError;
use frametag_models::ProviderKind;
use frametag_vision::VisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to read video duration: {0}")]
    Probe(#[source] MediaError),

    #[error("Failed to capture frame {index}: {source}")]
    Capture {
        index: usize,
        #[source]
        source: MediaError,
    },

    /// Sampler failure not tied to a single frame
    #[error("Failed to extract frames: {0}")]
    Extraction(#[source] MediaError),

    #[error("Missing {0} for the cloud provider")]
    MissingCredential(&'static str),

    #[error("Provider '{0}' is disabled in config")]
    ProviderDisabled(ProviderKind),

    #[error("Provider call failed: {0}")]
    Provider(#[source] VisionError),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[source] MediaError),
}

impl AnalysisError {
    pub fn from_probe(err: MediaError) -> Self {
        if err.is_cancelled() {
            AnalysisError::Cancelled
        } else {
            AnalysisError::Probe(err)
        }
    }

    /// Unwraps the sampler's `CaptureFailed` so the frame index is kept.
    pub fn from_capture(err: MediaError) -> Self {
        match err {
            MediaError::Cancelled => AnalysisError::Cancelled,
            MediaError::CaptureFailed { index, source } => {
                if source.is_cancelled() {
                    AnalysisError::Cancelled
                } else {
                    AnalysisError::Capture {
                        index,
                        source: *source,
                    }
                }
            }
            other => AnalysisError::Extraction(other),
        }
    }

    pub fn from_workspace(err: MediaError) -> Self {
        AnalysisError::Workspace(err)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }

    /// Label used for the outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::MissingCredential(_) | AnalysisError::ProviderDisabled(_) => {
                "rejected"
            }
            _ => "failed",
        }
    }
}

impl From<VisionError> for AnalysisError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Cancelled => AnalysisError::Cancelled,
            VisionError::MissingCredential(name) => AnalysisError::MissingCredential(name),
            VisionError::ProviderDisabled(kind) => AnalysisError::ProviderDisabled(kind),
            other => AnalysisError::Provider(other),
        }
    }
}
