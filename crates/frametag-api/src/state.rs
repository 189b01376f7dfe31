//! Application state.

use std::sync::Arc;

use frametag_media::FrameSampler;
use frametag_models::ProviderKind;
use frametag_vision::{CloudVisionClient, LocalVisionClient, VisionError, VisionProvider};
use tokio::sync::RwLock;

use crate::config::ApiConfig;
use crate::sessions::SessionRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sessions: SessionRegistry,
    pub sampler: Arc<FrameSampler>,
    pub local: Arc<LocalVisionClient>,
    pub cloud: Arc<CloudVisionClient>,
    /// Active local model, switchable at runtime
    local_model: Arc<RwLock<String>>,
}

impl AppState {
    /// Create new application state. Performs no network I/O.
    pub fn new(config: ApiConfig) -> Result<Self, VisionError> {
        let local = LocalVisionClient::new(config.local.clone())?;
        let cloud = CloudVisionClient::new(config.cloud.clone())?;
        let local_model = Arc::new(RwLock::new(config.local.model.clone()));

        Ok(Self {
            sessions: SessionRegistry::new(config.max_sessions),
            sampler: Arc::new(FrameSampler::new(config.sampler.clone())),
            local: Arc::new(local),
            cloud: Arc::new(cloud),
            local_model,
            config,
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> &dyn VisionProvider {
        match kind {
            ProviderKind::Local => &*self.local,
            ProviderKind::Cloud => &*self.cloud,
        }
    }

    /// Model identifier to send to `kind`.
    pub async fn model_for(&self, kind: ProviderKind) -> String {
        match kind {
            ProviderKind::Local => self.local_model.read().await.clone(),
            ProviderKind::Cloud => self.cloud.default_model().to_string(),
        }
    }

    pub async fn set_local_model(&self, model: String) {
        *self.local_model.write().await = model;
    }
}
