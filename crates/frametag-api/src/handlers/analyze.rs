//! Video upload and analysis handler.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use frametag_media::SessionWorkspace;
use frametag_models::{validate_frame_count, AnalysisRequest, AnalysisResult, ProviderKind, SessionId};
use frametag_vision::LanguageConfig;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::pipeline::{preflight, run_analysis, AnalysisContext, AnalysisError};
use crate::state::AppState;

/// Fields of the multipart analysis form.
#[derive(Debug, Default)]
struct AnalyzeForm {
    video: Option<UploadedVideo>,
    num_frames: Option<String>,
    provider: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug)]
struct UploadedVideo {
    file_name: Option<String>,
    bytes: Bytes,
}

impl AnalyzeForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "video" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    form.video = Some(UploadedVideo { file_name, bytes });
                }
                "numFrames" | "provider" | "sessionId" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    let slot = match name.as_str() {
                        "numFrames" => &mut form.num_frames,
                        "provider" => &mut form.provider,
                        _ => &mut form.session_id,
                    };
                    *slot = Some(value);
                }
                other => debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

/// Blank means "use the default"; anything else must be a positive integer
/// within the configured bound.
fn parse_frame_count(raw: Option<&str>, default: u32, max: u32) -> ApiResult<u32> {
    let count = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| ApiError::bad_request("numFrames must be a positive integer"))?,
    };
    validate_frame_count(count, max).map_err(ApiError::BadRequest)?;
    Ok(count)
}

fn parse_provider(raw: Option<&str>) -> ApiResult<ProviderKind> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(ProviderKind::default()),
        Some(s) => s
            .parse()
            .map_err(|e: frametag_models::ParseProviderKindError| ApiError::bad_request(e.to_string())),
    }
}

/// Analyze an uploaded video.
///
/// Rejects bad input and unusable providers before anything touches disk.
/// The upload and captured frames are removed on every exit path.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResult>> {
    let form = AnalyzeForm::read(multipart).await?;

    let video = form
        .video
        .filter(|v| !v.bytes.is_empty())
        .ok_or_else(|| ApiError::bad_request("No video file uploaded"))?;
    let frame_count = parse_frame_count(
        form.num_frames.as_deref(),
        state.config.default_num_frames,
        state.config.max_num_frames,
    )?;
    let provider_kind = parse_provider(form.provider.as_deref())?;
    let session_id = SessionId::from_client_or_new(form.session_id.as_deref());

    let provider = state.provider(provider_kind);
    preflight(provider)?;

    let guard = state.sessions.register(session_id.clone())?;
    let sessions = state.sessions.clone();
    metrics::set_sessions_in_flight(sessions.len());
    let session = scopeguard::guard(guard, move |guard| {
        drop(guard);
        metrics::set_sessions_in_flight(sessions.len());
    });

    info!(
        session_id = %session_id,
        provider = %provider_kind,
        frame_count,
        bytes = video.bytes.len(),
        "Received analysis request"
    );

    let workspace = SessionWorkspace::create(
        &state.config.work_dir,
        &session_id,
        video.file_name.as_deref(),
        &video.bytes,
    )
    .await
    .map_err(AnalysisError::from_workspace)?;
    // The upload is on disk now; release the in-memory copy.
    drop(video);

    let model = state.model_for(provider_kind).await;
    let language: &LanguageConfig = &state.config.language;
    let ctx = AnalysisContext {
        sampler: &state.sampler,
        provider,
        model,
        language,
    };
    let request = AnalysisRequest {
        video_path: workspace.video_path().to_path_buf(),
        frame_count,
        provider: provider_kind,
        session_id,
    };

    let result = run_analysis(&ctx, &request, workspace.frames_dir(), session.token()).await?;
    Ok(Json(result))
}
