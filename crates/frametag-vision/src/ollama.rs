//! Local model server client (Ollama).

use std::time::Duration;

use async_trait::async_trait;
use frametag_models::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LocalProviderConfig;
use crate::error::{VisionError, VisionResult};
use crate::provider::{cancellable, ProviderRequest, VisionProvider};

const LIST_MODELS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    images: &'a [String],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    name: Option<String>,
}

/// Client for a locally hosted vision model.
pub struct LocalVisionClient {
    http: Client,
    config: LocalProviderConfig,
}

impl LocalVisionClient {
    /// Create a new client. No network I/O happens here.
    pub fn new(config: LocalProviderConfig) -> VisionResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VisionError::Network)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LocalProviderConfig {
        &self.config
    }

    /// Names of the models installed on the server.
    ///
    /// Tries `/api/tags` first and falls back to `/api/models`.
    pub async fn list_models(&self) -> VisionResult<Vec<String>> {
        match self.fetch_models("/api/tags").await {
            Ok(names) => Ok(names),
            Err(e) => {
                warn!("Listing models via /api/tags failed, trying /api/models: {}", e);
                self.fetch_models("/api/models").await
            }
        }
    }

    async fn fetch_models(&self, path: &str) -> VisionResult<Vec<String>> {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .http
            .get(&url)
            .timeout(LIST_MODELS_TIMEOUT)
            .send()
            .await
            .map_err(|e| VisionError::from_transport(e, LIST_MODELS_TIMEOUT.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed { status, body });
        }

        let list: ModelList = response.json().await?;
        Ok(list
            .models
            .into_iter()
            .filter_map(|m| m.name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    async fn generate(&self, request: &ProviderRequest) -> VisionResult<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = GenerateRequest {
            model: &request.model,
            prompt: request.instructions.combined(),
            images: &request.images,
            stream: false,
        };

        debug!(
            model = %request.model,
            images = request.images.len(),
            "Sending generate request to {}",
            url
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::from_transport(e, self.config.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed { status, body });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| VisionError::from_transport(e, self.config.timeout.as_secs()))?;

        Ok(response_text(data))
    }
}

/// The `response` field, or the whole body serialized when it is missing.
fn response_text(data: Value) -> String {
    match data.get("response").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => data.to_string(),
    }
}

#[async_trait]
impl VisionProvider for LocalVisionClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn analyze(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> VisionResult<String> {
        self.ensure_ready()?;
        cancellable(cancel, self.generate(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_text() {
        assert_eq!(response_text(json!({"response": "{\"a\":1}"})), "{\"a\":1}");
        assert_eq!(
            response_text(json!({"done": true})),
            "{\"done\":true}"
        );
        assert_eq!(
            response_text(json!({"response": ""})),
            "{\"response\":\"\"}"
        );
    }

    #[tokio::test]
    async fn test_disabled_provider_is_rejected() {
        let client = LocalVisionClient::new(LocalProviderConfig {
            enabled: false,
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .unwrap();

        let request = ProviderRequest {
            images: vec![],
            instructions: Default::default(),
            model: "m".to_string(),
        };
        let result = client.analyze(&request, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(VisionError::ProviderDisabled(ProviderKind::Local))
        ));
    }
}
