//! Structured lifecycle logging for analysis sessions.

use frametag_models::{ProviderKind, SessionId};
use tracing::{error, info, warn, Span};

/// Logs session lifecycle events with the session id and provider attached.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    provider: ProviderKind,
}

impl SessionLogger {
    pub fn new(session_id: &SessionId, provider: ProviderKind) -> Self {
        Self {
            session_id: session_id.to_string(),
            provider,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            provider = %self.provider,
            "Analysis started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            provider = %self.provider,
            "Analysis progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            provider = %self.provider,
            "Analysis warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            provider = %self.provider,
            "Analysis error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            provider = %self.provider,
            "Analysis completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Span wrapping one whole analysis.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis",
            session_id = %self.session_id,
            provider = %self.provider
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_logger_creation() {
        let id = SessionId::parse("abc-123").unwrap();
        let logger = SessionLogger::new(&id, ProviderKind::Cloud);

        assert_eq!(logger.session_id(), "abc-123");
        assert_eq!(logger.provider(), ProviderKind::Cloud);
    }
}
