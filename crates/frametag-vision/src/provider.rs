//! Provider abstraction shared by the local and cloud clients.

use async_trait::async_trait;
use frametag_models::ProviderKind;
use tokio_util::sync::CancellationToken;

use crate::error::{VisionError, VisionResult};

/// System and user instructions for one provider call.
#[derive(Debug, Clone, Default)]
pub struct Instructions {
    pub system: String,
    pub user: String,
}

impl Instructions {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Single prompt for backends without a system role.
    pub fn combined(&self) -> String {
        if self.user.is_empty() {
            self.system.clone()
        } else {
            format!("{}\n\n{}", self.system, self.user)
        }
    }
}

/// One request to a vision model.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Base64 JPEG payloads, in frame order
    pub images: Vec<String>,
    pub instructions: Instructions,
    pub model: String,
}

/// A vision-language model backend.
///
/// Implementations return the raw model text; parsing and alignment happen
/// elsewhere. If `cancel` fires before or during the call, the call returns
/// [`VisionError::Cancelled`](crate::VisionError::Cancelled) promptly.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether the provider may be used at all.
    fn is_enabled(&self) -> bool;

    /// Default model identifier.
    fn default_model(&self) -> &str;

    /// Fail fast, before any media work, if a call could not succeed.
    fn ensure_ready(&self) -> VisionResult<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(VisionError::ProviderDisabled(self.kind()))
        }
    }

    async fn analyze(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> VisionResult<String>;
}

/// Race `fut` against `cancel`. The losing future is dropped, which aborts
/// any in-flight HTTP request.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> VisionResult<T>
where
    F: std::future::Future<Output = VisionResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(VisionError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VisionError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_prompt() {
        let i = Instructions::new("sys", "user");
        assert_eq!(i.combined(), "sys\n\nuser");
        assert_eq!(Instructions::new("sys", "").combined(), "sys");
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { Ok::<_, VisionError>(1) }).await;
        assert!(matches!(result, Err(VisionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_interrupts_pending_call() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = cancellable(&token, async {
            std::future::pending::<()>().await;
            Ok::<_, VisionError>(())
        })
        .await;
        assert!(matches!(result, Err(VisionError::Cancelled)));
    }
}
