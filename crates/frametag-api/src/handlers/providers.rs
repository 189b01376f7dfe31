//! Provider configuration and local model selection.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use frametag_models::ProviderKind;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub providers: ProvidersInfo,
    pub language: LanguageInfo,
    pub default_num_frames: u32,
    pub max_num_frames: u32,
}

#[derive(Debug, Serialize)]
pub struct ProvidersInfo {
    pub local: ProviderInfo,
    pub cloud: ProviderInfo,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub model: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: String,
    pub label: String,
}

/// Runtime configuration exposed to the UI. Never includes credentials.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        providers: ProvidersInfo {
            local: ProviderInfo {
                model: state.model_for(ProviderKind::Local).await,
                enabled: state.config.local.enabled,
            },
            cloud: ProviderInfo {
                model: state.model_for(ProviderKind::Cloud).await,
                enabled: state.config.cloud.enabled,
            },
        },
        language: LanguageInfo {
            code: state.config.language.code.clone(),
            label: state.config.language.label.clone(),
        },
        default_num_frames: state.config.default_num_frames,
        max_num_frames: state.config.max_num_frames,
    })
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Models installed on the local model server.
pub async fn list_local_models(State(state): State<AppState>) -> ApiResult<Json<ModelsResponse>> {
    let models = state
        .local
        .list_models()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok(Json(ModelsResponse { models }))
}

#[derive(Debug, Deserialize)]
pub struct SetModelRequest {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetModelResponse {
    pub ok: bool,
    pub model: String,
}

/// Switch the local model used by subsequent requests.
pub async fn set_local_model(
    State(state): State<AppState>,
    body: Result<Json<SetModelRequest>, JsonRejection>,
) -> ApiResult<Json<SetModelResponse>> {
    let model = body
        .ok()
        .and_then(|Json(req)| req.model)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing 'model' in body"))?;

    state.set_local_model(model.clone()).await;
    info!(model = %model, "Local model changed");

    Ok(Json(SetModelResponse { ok: true, model }))
}
