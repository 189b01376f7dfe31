//! Vision provider error types.

use frametag_models::ProviderKind;
use thiserror::Error;

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Missing {0} for the cloud provider")]
    MissingCredential(&'static str),

    #[error("Provider '{0}' is disabled in config")]
    ProviderDisabled(ProviderKind),

    #[error("Provider call cancelled")]
    Cancelled,

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Provider returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VisionError::Cancelled)
    }

    /// Map a transport error, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            VisionError::Timeout(timeout_secs)
        } else {
            VisionError::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            VisionError::MissingCredential("OPENROUTER_API_KEY").to_string(),
            "Missing OPENROUTER_API_KEY for the cloud provider"
        );
        assert_eq!(
            VisionError::ProviderDisabled(ProviderKind::Local).to_string(),
            "Provider 'local' is disabled in config"
        );
        assert!(VisionError::Cancelled.is_cancelled());
        assert!(!VisionError::Timeout(3).is_cancelled());
    }
}
