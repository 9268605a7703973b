//! Clip processing pipeline.
//!
//! One run per [`ClipRequest`]: acquire a scoped work directory, fetch,
//! trim, crop, encode, check the size, deliver, then clean up and reset the
//! user's session. The steps run on their own task so a panic surfaces as a
//! [`JoinError`](tokio::task::JoinError) instead of tearing down the caller,
//! and the whole run is bounded by a timeout. Every failure reaches the
//! single terminal handler in [`ClipPipeline::run`], which sends exactly one
//! failure message.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::Instrument;

use clipbot_media::{MediaEngine, VideoFetcher};
use clipbot_models::{ClipRequest, EncodingConfig, UserId};

use crate::config::BotConfig;
use crate::error::PipelineError;
use crate::logging::RunLogger;
use crate::session_store::SessionStore;
use crate::transport::{Keyboard, Transport};

pub const DOWNLOADING_NOTICE: &str = "⬇️ Downloading video... This may take a while.";
pub const PROCESSING_NOTICE: &str = "✂️ Processing video...";
pub const READY_NOTICE: &str = "✅ Your video is ready!";

/// Caption title used when the source reported none.
const FALLBACK_TITLE: &str = "YouTube Download";

const OUTPUT_FILE_NAME: &str = "output.mp4";

/// Pipeline knobs taken from [`BotConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Root for per-run work directories
    pub work_root: PathBuf,
    pub max_upload_bytes: u64,
    pub timeout: Duration,
    pub encoding: EncodingConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&BotConfig::new(""))
    }
}

impl From<&BotConfig> for PipelineSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            work_root: config.work_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            timeout: config.pipeline_timeout,
            encoding: config.encoding.clone(),
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The clip was uploaded
    Delivered { size_bytes: u64 },
    /// The clip was produced but is too large to upload
    Oversize { size_bytes: u64 },
}

impl PipelineOutcome {
    fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Delivered { .. } => "delivered",
            PipelineOutcome::Oversize { .. } => "oversize",
        }
    }
}

pub struct ClipPipeline {
    settings: PipelineSettings,
    store: SessionStore,
    transport: Arc<dyn Transport>,
    fetcher: Arc<dyn VideoFetcher>,
    engine: Arc<dyn MediaEngine>,
}

impl ClipPipeline {
    pub fn new(
        settings: PipelineSettings,
        store: SessionStore,
        transport: Arc<dyn Transport>,
        fetcher: Arc<dyn VideoFetcher>,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            settings,
            store,
            transport,
            fetcher,
            engine,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one run to completion, including cleanup and session reset.
    ///
    /// The error is returned for callers that want it; it has already been
    /// logged and reported to the user.
    pub async fn run(self: Arc<Self>, request: ClipRequest) -> Result<PipelineOutcome, PipelineError> {
        let logger = RunLogger::new(&request.run_id, request.user_id, "clip_pipeline");
        let span = logger.create_span();
        self.run_logged(request, logger).instrument(span).await
    }

    async fn run_logged(
        self: Arc<Self>,
        request: ClipRequest,
        logger: RunLogger,
    ) -> Result<PipelineOutcome, PipelineError> {
        let user_id = request.user_id;
        let started = Instant::now();
        logger.log_start(&format!(
            "url={} trim={:?} ratio={}",
            request.source_url, request.trim, request.aspect_ratio
        ));

        let result = match self.acquire_work_dir().await {
            Ok(work_dir) => {
                self.store
                    .record_work_dir(user_id, Some(work_dir.path().to_path_buf()))
                    .await;

                let result = self.supervise(&request, work_dir.path()).await;

                let dir_path = work_dir.path().to_path_buf();
                if let Err(e) = work_dir.close() {
                    logger.log_warning(&format!(
                        "failed to remove work dir {}: {}",
                        dir_path.display(),
                        e
                    ));
                }
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => logger.log_completion(&format!(
                "{} in {:.1}s",
                outcome.label(),
                started.elapsed().as_secs_f64()
            )),
            Err(e) => {
                logger.log_error(&format!("{} step failed: {}", e.kind(), e));
                self.notify(user_id, &e.user_message()).await;
            }
        }

        let outcome_label = match &result {
            Ok(outcome) => outcome.label(),
            Err(e) => e.kind(),
        };
        metrics::counter!("clipbot_pipeline_runs_total", "outcome" => outcome_label).increment(1);
        metrics::histogram!("clipbot_pipeline_duration_seconds").record(started.elapsed().as_secs_f64());

        self.store.reset(user_id).await;
        result
    }

    async fn acquire_work_dir(&self) -> Result<TempDir, PipelineError> {
        tokio::fs::create_dir_all(&self.settings.work_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&self.settings.work_root)?;
        Ok(dir)
    }

    /// Run the steps on a child task, mapping panics and timeouts to errors.
    ///
    /// Returns only once the child task has stopped, so the caller can
    /// delete the work directory safely.
    async fn supervise(self: &Arc<Self>, request: &ClipRequest, work_dir: &Path) -> Result<PipelineOutcome, PipelineError> {
        let this = Arc::clone(self);
        let child_request = request.clone();
        let child_dir = work_dir.to_path_buf();
        let mut task = tokio::spawn(
            async move { this.execute(&child_request, &child_dir).await }.in_current_span(),
        );

        match tokio::time::timeout(self.settings.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(PipelineError::Crashed(describe_join_error(join_err))),
            Err(_) => {
                task.abort();
                // Dropping the step future kills any running subprocess.
                let _ = task.await;
                Err(PipelineError::Timeout(self.settings.timeout))
            }
        }
    }

    async fn execute(&self, request: &ClipRequest, work_dir: &Path) -> Result<PipelineOutcome, PipelineError> {
        let user_id = request.user_id;

        self.notify(user_id, DOWNLOADING_NOTICE).await;
        let fetched = self
            .fetcher
            .fetch(&request.source_url, work_dir)
            .await
            .map_err(PipelineError::Fetch)?;

        self.notify(user_id, PROCESSING_NOTICE).await;
        let mut handle = self
            .engine
            .open(&fetched.path)
            .await
            .map_err(PipelineError::Transform)?;
        if let Some(range) = request.trim {
            handle = handle.trim(range).map_err(PipelineError::Transform)?;
        }
        let handle = handle
            .crop_to_ratio(request.aspect_ratio)
            .map_err(PipelineError::Transform)?;

        let output = work_dir.join(OUTPUT_FILE_NAME);
        let output = self
            .engine
            .encode(&handle, &output, &self.settings.encoding)
            .await
            .map_err(PipelineError::Encode)?;

        let size_bytes = tokio::fs::metadata(&output).await?.len();
        if size_bytes > self.settings.max_upload_bytes {
            self.notify(user_id, &self.oversize_message(size_bytes)).await;
            return Ok(PipelineOutcome::Oversize { size_bytes });
        }

        self.notify(user_id, READY_NOTICE).await;
        let caption = caption_for(fetched.title.as_deref());
        self.transport
            .send_file(user_id, &output, &caption)
            .await
            .map_err(PipelineError::Delivery)?;

        Ok(PipelineOutcome::Delivered { size_bytes })
    }

    fn oversize_message(&self, size_bytes: u64) -> String {
        format!(
            "⚠️ The processed video is {:.1}MB, which exceeds Telegram's {}MB limit. \
             Please use a shorter clip or different settings.",
            size_bytes as f64 / (1024.0 * 1024.0),
            self.settings.max_upload_bytes / (1024 * 1024)
        )
    }

    /// Best-effort status message; a lost notice does not fail the run.
    async fn notify(&self, user_id: UserId, text: &str) {
        if let Err(e) = self.transport.send_text(user_id, text, &Keyboard::None).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to send notice");
        }
    }
}

pub fn caption_for(title: Option<&str>) -> String {
    format!(
        "Processed YouTube video - {}",
        title.filter(|t| !t.trim().is_empty()).unwrap_or(FALLBACK_TITLE)
    )
}

fn describe_join_error(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic".to_string())
    } else {
        "task cancelled".to_string()
    }
}
