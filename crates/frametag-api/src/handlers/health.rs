//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use frametag_media::{check_ffmpeg, check_ffprobe, MediaResult};
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub work_dir: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn tool_check<T>(check: impl FnOnce() -> MediaResult<T>) -> CheckStatus {
    let start = Instant::now();
    match check() {
        Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => CheckStatus::error(e.to_string()),
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the media tools are on PATH and the work dir is usable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg_check = tool_check(check_ffmpeg);
    let ffprobe_check = tool_check(check_ffprobe);

    let work_dir_check = {
        let start = Instant::now();
        match tokio::fs::create_dir_all(&state.config.work_dir).await {
            Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(format!(
                "{}: {}",
                state.config.work_dir.display(),
                e
            )),
        }
    };

    let all_ok = ffmpeg_check.is_ok() && ffprobe_check.is_ok() && work_dir_check.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg: ffmpeg_check,
            ffprobe: ffprobe_check,
            work_dir: work_dir_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
