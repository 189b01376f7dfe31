//! Per-request analysis pipeline.
//!
//! Steps run strictly in sequence: preflight, probe, capture, provider
//! call(s), normalization. The session token is checked before every
//! suspension point and passed into each one, so an abort stops the next
//! step from starting and interrupts the one in flight.

use std::path::Path;
use std::time::Instant;

use frametag_media::{probe_duration, sample_timestamps, FrameSampler};
use frametag_models::{
    AnalysisPayload, AnalysisRequest, AnalysisResult, AnalysisState, FrameAnnotation,
    SampledFrame,
};
use frametag_vision::prompt::{batch_instructions, single_frame_instructions};
use frametag_vision::{
    normalize_batch, normalize_single, LanguageConfig, ProviderRequest, VisionProvider,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use super::error::AnalysisError;
use super::logging::SessionLogger;
use crate::metrics;

/// Everything one run needs besides the request itself.
pub struct AnalysisContext<'a> {
    pub sampler: &'a FrameSampler,
    pub provider: &'a dyn VisionProvider,
    /// Model identifier sent to the provider
    pub model: String,
    pub language: &'a LanguageConfig,
}

/// Reject a request whose provider can't be called, before any media work.
pub fn preflight(provider: &dyn VisionProvider) -> Result<(), AnalysisError> {
    provider.ensure_ready().map_err(AnalysisError::from)
}

/// Tracks the request through [`AnalysisState`].
struct StateTracker<'a> {
    state: AnalysisState,
    logger: &'a SessionLogger,
}

impl<'a> StateTracker<'a> {
    fn new(logger: &'a SessionLogger) -> Self {
        Self {
            state: AnalysisState::Created,
            logger,
        }
    }

    fn advance(&mut self, next: AnalysisState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(
            session_id = %self.logger.session_id(),
            from = self.state.as_str(),
            to = next.as_str(),
            "Analysis state changed"
        );
        self.state = next;
    }

    fn fail(&mut self, err: &AnalysisError) {
        if err.is_cancelled() {
            if self.state.can_transition_to(AnalysisState::Cancelled) {
                self.advance(AnalysisState::Cancelled);
            }
            self.logger.log_warning("cancelled by client");
        } else {
            if self.state.can_transition_to(AnalysisState::Failed) {
                self.advance(AnalysisState::Failed);
            }
            self.logger.log_error(&err.to_string());
        }
    }
}

/// Run one analysis end to end.
///
/// Frames are written into `frames_dir`, which the caller owns and removes.
/// A cancelled run always yields [`AnalysisError::Cancelled`], never a
/// partial result.
pub async fn run_analysis(
    ctx: &AnalysisContext<'_>,
    request: &AnalysisRequest,
    frames_dir: &Path,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, AnalysisError> {
    let logger = SessionLogger::new(&request.session_id, request.provider);
    let span = logger.create_span();
    let started = Instant::now();
    let mut tracker = StateTracker::new(&logger);

    let result = execute(ctx, request, frames_dir, cancel, &mut tracker)
        .instrument(span)
        .await;

    let elapsed = started.elapsed().as_secs_f64();
    match &result {
        Ok(_) => metrics::record_analysis(request.provider.as_str(), "completed", elapsed),
        Err(e) => {
            tracker.fail(e);
            metrics::record_analysis(request.provider.as_str(), e.outcome(), elapsed);
        }
    }
    result
}

async fn execute(
    ctx: &AnalysisContext<'_>,
    request: &AnalysisRequest,
    frames_dir: &Path,
    cancel: &CancellationToken,
    tracker: &mut StateTracker<'_>,
) -> Result<AnalysisResult, AnalysisError> {
    let logger = tracker.logger;
    preflight(ctx.provider)?;
    logger.log_start(&format!(
        "{} frames with model {}",
        request.frame_count, ctx.model
    ));

    tracker.advance(AnalysisState::Extracting);
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    let frames = extract_frames(ctx.sampler, request, frames_dir, cancel).await?;
    metrics::record_frames_captured(request.provider.as_str(), frames.len());
    logger.log_progress(&format!("captured {} frames", frames.len()));

    tracker.advance(AnalysisState::Analyzing);
    let payload = annotate_frames(ctx, &frames, cancel, logger).await?;

    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    tracker.advance(AnalysisState::Normalizing);
    let result = AnalysisResult::new(
        request.provider,
        ctx.model.clone(),
        request.session_id.clone(),
        &frames,
        payload,
    );
    debug_assert!(result.is_aligned());

    tracker.advance(AnalysisState::Completed);
    logger.log_completion(&format!("{} annotations", result.analysis.frames.len()));
    Ok(result)
}

async fn extract_frames(
    sampler: &FrameSampler,
    request: &AnalysisRequest,
    frames_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<SampledFrame>, AnalysisError> {
    let duration = probe_duration(&request.video_path, cancel)
        .await
        .map_err(AnalysisError::from_probe)?;

    let timestamps = sample_timestamps(duration, request.frame_count as usize);
    debug!(
        duration_sec = duration,
        count = timestamps.len(),
        "Sampling timestamps"
    );

    sampler
        .capture_frames(&request.video_path, frames_dir, &timestamps, cancel)
        .await
        .map_err(AnalysisError::from_capture)
}

/// Ask the provider about `frames` and normalize the answer.
///
/// Per-frame providers get one call per frame in index order; a failed call
/// leaves that frame empty. Batch providers get one call for all frames and
/// any failure is fatal.
pub async fn annotate_frames(
    ctx: &AnalysisContext<'_>,
    frames: &[SampledFrame],
    cancel: &CancellationToken,
    logger: &SessionLogger,
) -> Result<AnalysisPayload, AnalysisError> {
    if ctx.provider.kind().is_per_frame() {
        annotate_each(ctx, frames, cancel, logger).await
    } else {
        annotate_batch(ctx, frames, cancel).await
    }
}

async fn annotate_each(
    ctx: &AnalysisContext<'_>,
    frames: &[SampledFrame],
    cancel: &CancellationToken,
    logger: &SessionLogger,
) -> Result<AnalysisPayload, AnalysisError> {
    let instructions = single_frame_instructions(ctx.language);
    let mut annotations = Vec::with_capacity(frames.len());

    for frame in frames {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let request = ProviderRequest {
            images: vec![frame.image_base64()],
            instructions: instructions.clone(),
            model: ctx.model.clone(),
        };

        match call_provider(ctx.provider, &request, cancel).await {
            Ok(raw) => {
                annotations.push(normalize_single(&raw, frame.index, frame.timestamp_sec));
            }
            Err(AnalysisError::Cancelled) => return Err(AnalysisError::Cancelled),
            Err(e) => {
                logger.log_warning(&format!("frame {} left empty: {}", frame.index, e));
                annotations.push(FrameAnnotation::empty(frame.index, frame.timestamp_sec));
            }
        }
    }

    Ok(AnalysisPayload {
        frames: annotations,
        overall: None,
        error: None,
        raw: None,
    })
}

async fn annotate_batch(
    ctx: &AnalysisContext<'_>,
    frames: &[SampledFrame],
    cancel: &CancellationToken,
) -> Result<AnalysisPayload, AnalysisError> {
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    let request = ProviderRequest {
        images: frames.iter().map(SampledFrame::image_base64).collect(),
        instructions: batch_instructions(ctx.language, frames.len()),
        model: ctx.model.clone(),
    };
    let raw = call_provider(ctx.provider, &request, cancel).await?;

    let timestamps: Vec<f64> = frames.iter().map(|f| f.timestamp_sec).collect();
    Ok(normalize_batch(&raw, &timestamps))
}

async fn call_provider(
    provider: &dyn VisionProvider,
    request: &ProviderRequest,
    cancel: &CancellationToken,
) -> Result<String, AnalysisError> {
    let started = Instant::now();
    let result = provider.analyze(request, cancel).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) if e.is_cancelled() => "cancelled",
        Err(_) => "error",
    };
    metrics::record_provider_call(
        provider.kind().as_str(),
        outcome,
        started.elapsed().as_secs_f64(),
    );

    result.map_err(AnalysisError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use frametag_models::{ProviderKind, SessionId};
    use frametag_vision::{VisionError, VisionResult};

    /// Scripted provider: answers from `replies` in call order.
    struct FakeProvider {
        kind: ProviderKind,
        ready: fn() -> VisionResult<()>,
        replies: Vec<VisionResult<String>>,
        calls: AtomicUsize,
        cancel_on_call: Option<(usize, CancellationToken)>,
    }

    impl FakeProvider {
        fn new(kind: ProviderKind, replies: Vec<VisionResult<String>>) -> Self {
            Self {
                kind,
                ready: || Ok(()),
                replies,
                calls: AtomicUsize::new(0),
                cancel_on_call: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn default_model(&self) -> &str {
            "fake"
        }

        fn ensure_ready(&self) -> VisionResult<()> {
            (self.ready)()
        }

        async fn analyze(
            &self,
            _request: &ProviderRequest,
            cancel: &CancellationToken,
        ) -> VisionResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((at, token)) = &self.cancel_on_call {
                if *at == n {
                    token.cancel();
                }
            }
            if cancel.is_cancelled() {
                return Err(VisionError::Cancelled);
            }
            match self.replies.get(n) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(_)) => Err(VisionError::RequestFailed {
                    status: 500,
                    body: "boom".to_string(),
                }),
                None => Ok(String::new()),
            }
        }
    }

    fn frames(n: usize) -> Vec<SampledFrame> {
        (0..n)
            .map(|i| SampledFrame::new(i, i as f64 + 0.5, vec![0xFF, 0xD8, i as u8]))
            .collect()
    }

    fn logger(kind: ProviderKind) -> SessionLogger {
        SessionLogger::new(&SessionId::parse("test").unwrap(), kind)
    }

    fn context<'a>(
        sampler: &'a FrameSampler,
        provider: &'a dyn VisionProvider,
        language: &'a LanguageConfig,
    ) -> AnalysisContext<'a> {
        AnalysisContext {
            sampler,
            provider,
            model: "fake".to_string(),
            language,
        }
    }

    #[tokio::test]
    async fn test_local_calls_once_per_frame_in_order() {
        let provider = FakeProvider::new(
            ProviderKind::Local,
            vec![
                Ok(r#"{"caption": "a"}"#.to_string()),
                Ok(r#"{"caption": "b"}"#.to_string()),
                Ok(r#"{"caption": "c"}"#.to_string()),
            ],
        );
        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);

        let payload = annotate_frames(
            &ctx,
            &frames(3),
            &CancellationToken::new(),
            &logger(ProviderKind::Local),
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 3);
        let captions: Vec<&str> = payload.frames.iter().map(|f| f.caption.as_str()).collect();
        assert_eq!(captions, vec!["a", "b", "c"]);
        let indices: Vec<usize> = payload.frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(payload.overall.is_none());
    }

    #[tokio::test]
    async fn test_local_failure_degrades_single_frame() {
        let provider = FakeProvider::new(
            ProviderKind::Local,
            vec![
                Ok(r#"{"caption": "a"}"#.to_string()),
                Err(VisionError::Timeout(1)),
                Ok(r#"{"caption": "c"}"#.to_string()),
            ],
        );
        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);

        let payload = annotate_frames(
            &ctx,
            &frames(3),
            &CancellationToken::new(),
            &logger(ProviderKind::Local),
        )
        .await
        .unwrap();

        assert_eq!(payload.frames.len(), 3);
        assert_eq!(payload.frames[0].caption, "a");
        assert!(payload.frames[1].is_empty());
        assert_eq!(payload.frames[1].index, 1);
        assert_eq!(payload.frames[2].caption, "c");
    }

    #[tokio::test]
    async fn test_cancel_mid_sequence_stops_further_calls() {
        let token = CancellationToken::new();
        let mut provider = FakeProvider::new(
            ProviderKind::Local,
            (0..5).map(|_| Ok("{}".to_string())).collect(),
        );
        // Abort arrives while the second call is in flight.
        provider.cancel_on_call = Some((1, token.clone()));

        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);

        let result =
            annotate_frames(&ctx, &frames(5), &token, &logger(ProviderKind::Local)).await;

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_cloud_single_batch_call_with_overall() {
        let provider = FakeProvider::new(
            ProviderKind::Cloud,
            vec![Ok(r#"```json
{"frames": [{"index": 0, "caption": "x"}, {"index": 1, "caption": "y"}],
 "overall": {"summary": "two shots"}}
```"#
                .to_string())],
        );
        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);

        let payload = annotate_frames(
            &ctx,
            &frames(2),
            &CancellationToken::new(),
            &logger(ProviderKind::Cloud),
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(payload.frames[1].caption, "y");
        assert_eq!(payload.overall.unwrap().summary, "two shots");
    }

    #[tokio::test]
    async fn test_cloud_failure_is_fatal() {
        let provider = FakeProvider::new(
            ProviderKind::Cloud,
            vec![Err(VisionError::Timeout(1))],
        );
        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);

        let result = annotate_frames(
            &ctx,
            &frames(2),
            &CancellationToken::new(),
            &logger(ProviderKind::Cloud),
        )
        .await;
        assert!(matches!(result, Err(AnalysisError::Provider(_))));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_media_work() {
        let mut provider = FakeProvider::new(ProviderKind::Cloud, vec![]);
        provider.ready = || Err(VisionError::MissingCredential("OPENROUTER_API_KEY"));

        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);
        let request = AnalysisRequest {
            video_path: PathBuf::from("/nonexistent/video.mp4"),
            frame_count: 4,
            provider: ProviderKind::Cloud,
            session_id: SessionId::new(),
        };
        let dir = tempfile::tempdir().unwrap();

        let result = run_analysis(&ctx, &request, dir.path(), &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(AnalysisError::MissingCredential("OPENROUTER_API_KEY"))
        ));
        assert_eq!(provider.calls(), 0);
        assert_eq!(frametag_media::workspace::count_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_is_cancelled() {
        let provider = FakeProvider::new(ProviderKind::Local, vec![]);
        let sampler = FrameSampler::default();
        let language = LanguageConfig::default();
        let ctx = context(&sampler, &provider, &language);
        let request = AnalysisRequest {
            video_path: PathBuf::from("/nonexistent/video.mp4"),
            frame_count: 2,
            provider: ProviderKind::Local,
            session_id: SessionId::new(),
        };
        let token = CancellationToken::new();
        token.cancel();
        let dir = tempfile::tempdir().unwrap();

        let result = run_analysis(&ctx, &request, dir.path(), &token).await;
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_cancel_while_analyzing_ends_cancelled() {
        let logger = logger(ProviderKind::Local);
        let mut tracker = StateTracker::new(&logger);
        tracker.advance(AnalysisState::Extracting);
        tracker.advance(AnalysisState::Analyzing);

        tracker.fail(&AnalysisError::Cancelled);
        assert_eq!(tracker.state, AnalysisState::Cancelled);
        assert!(tracker.state.is_terminal());
    }

    #[test]
    fn test_normalizing_cannot_be_cancelled() {
        assert!(!AnalysisState::Normalizing.can_transition_to(AnalysisState::Cancelled));
        assert!(AnalysisState::Analyzing.can_transition_to(AnalysisState::Cancelled));
    }
}
