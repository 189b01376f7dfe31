//! Client-initiated cancellation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use frametag_models::SessionId;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AbortResponse {
    pub ok: bool,
    /// Whether an in-flight session was found and signalled
    pub aborted: bool,
}

/// Cancel an in-flight analysis by session id.
pub async fn abort(
    State(state): State<AppState>,
    body: Result<Json<AbortRequest>, JsonRejection>,
) -> ApiResult<Json<AbortResponse>> {
    let session_id = body
        .ok()
        .and_then(|Json(req)| req.session_id)
        .and_then(|id| SessionId::parse(&id))
        .ok_or_else(|| ApiError::bad_request("Missing sessionId"))?;

    let aborted = state.sessions.abort(&session_id);
    metrics::record_abort(aborted);
    metrics::set_sessions_in_flight(state.sessions.len());

    Ok(Json(AbortResponse { ok: true, aborted }))
}
