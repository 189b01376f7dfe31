//! Cloud chat-completions client (OpenRouter, OpenAI-compatible).

use async_trait::async_trait;
use frametag_models::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CloudProviderConfig;
use crate::error::{VisionError, VisionResult};
use crate::provider::{cancellable, ProviderRequest, VisionProvider};

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// First choice's content, or an empty string.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

fn build_body<'a>(request: &'a ProviderRequest) -> ChatRequest<'a> {
    let mut parts = Vec::with_capacity(request.images.len() + 1);
    parts.push(ContentPart::Text {
        text: &request.instructions.user,
    });
    parts.extend(request.images.iter().map(|b64| ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: format!("data:image/jpeg;base64,{}", b64),
        },
    }));

    ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(&request.instructions.system),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
        temperature: TEMPERATURE,
    }
}

/// Client for the hosted multi-image model.
pub struct CloudVisionClient {
    http: Client,
    config: CloudProviderConfig,
}

impl CloudVisionClient {
    /// Create a new client. No network I/O happens here.
    pub fn new(config: CloudProviderConfig) -> VisionResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VisionError::Network)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CloudProviderConfig {
        &self.config
    }

    /// The credential to send, checked along with the enabled flag.
    fn api_key(&self) -> VisionResult<&str> {
        if !self.config.enabled {
            return Err(VisionError::ProviderDisabled(ProviderKind::Cloud));
        }
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(VisionError::MissingCredential("OPENROUTER_API_KEY"))
    }

    async fn complete(&self, api_key: &str, request: &ProviderRequest) -> VisionResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!(
            model = %request.model,
            images = request.images.len(),
            "Sending chat completion to {}",
            url
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| VisionError::from_transport(e, self.config.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed { status, body });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        Ok(chat.into_text())
    }
}

#[async_trait]
impl VisionProvider for CloudVisionClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn ensure_ready(&self) -> VisionResult<()> {
        self.api_key().map(|_| ())
    }

    async fn analyze(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> VisionResult<String> {
        let api_key = self.api_key()?;
        cancellable(cancel, self.complete(api_key, request)).await
    }
}
