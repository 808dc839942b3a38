//! Preview pipeline orchestration.
//!
//! One run takes one source object through
//! `Fetching → Probing → Planning → Extracting → Assembling → Publishing → Done`.
//! Any stage may end the run in `Failed(kind)`. Per-window extraction
//! failures are absorbed as long as one sample survives.
//!
//! All local files of a run live in a single temporary directory owned by
//! the run future, so the directory is removed on every exit path,
//! including cancellation when the invocation timeout drops the future.

use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, Instrument};

use preview_media::{plan_samples, MediaError, MediaToolchain};
use preview_models::{
    derive_output_key, IntermediateClip, OutputFormat, PipelineConfig, PreviewArtifact,
    SampleWindow, SourceVideo,
};
use preview_storage::ObjectStore;

use crate::error::{FailureKind, WorkerError, WorkerResult};
use crate::logging::InvocationLogger;
use crate::metrics;

/// Pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Fetching,
    Probing,
    Planning,
    Extracting,
    Assembling,
    Publishing,
    Done,
    Failed(FailureKind),
}

impl PipelineState {
    /// The state following this one on the success path.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Fetching => Some(PipelineState::Probing),
            PipelineState::Probing => Some(PipelineState::Planning),
            PipelineState::Planning => Some(PipelineState::Extracting),
            PipelineState::Extracting => Some(PipelineState::Assembling),
            PipelineState::Assembling => Some(PipelineState::Publishing),
            PipelineState::Publishing => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Fetching => f.write_str("fetching"),
            PipelineState::Probing => f.write_str("probing"),
            PipelineState::Planning => f.write_str("planning"),
            PipelineState::Extracting => f.write_str("extracting"),
            PipelineState::Assembling => f.write_str("assembling"),
            PipelineState::Publishing => f.write_str("publishing"),
            PipelineState::Done => f.write_str("done"),
            PipelineState::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// The source object of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub bucket: String,
    /// Decoded object key
    pub key: String,
}

impl PreviewRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// A window dropped from the preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleFailure {
    pub index: u32,
    pub error: String,
}

/// Summary of a successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub invocation_id: String,
    pub source_bucket: String,
    pub source_key: String,
    pub output_bucket: String,
    pub output_key: String,
    pub format: OutputFormat,
    /// Probed source duration in seconds
    pub source_duration: f64,
    /// Probed preview duration in seconds
    pub preview_duration: f64,
    pub windows: Vec<SampleWindow>,
    /// Indices of the windows that made it into the preview
    pub succeeded: Vec<u32>,
    pub failures: Vec<SampleFailure>,
    /// Published size in bytes
    pub size: u64,
}

impl PreviewReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Runtime knobs that are not part of the preview itself.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root for the per-invocation temporary directory (system temp dir if unset)
    pub work_dir: Option<PathBuf>,
    /// Maximum concurrent extractions
    pub max_parallel: usize,
    /// Whole-invocation timeout
    pub timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: None,
            max_parallel: 4,
            timeout: None,
        }
    }
}

/// Orchestrates storage and media capabilities for one invocation at a time.
///
/// Runs share no mutable state; one pipeline may serve concurrent runs.
pub struct PreviewPipeline<S, M> {
    store: Arc<S>,
    media: Arc<M>,
    config: Arc<PipelineConfig>,
    options: PipelineOptions,
}

impl<S, M> Clone for PreviewPipeline<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            media: Arc::clone(&self.media),
            config: Arc::clone(&self.config),
            options: self.options.clone(),
        }
    }
}

impl<S: ObjectStore, M: MediaToolchain> PreviewPipeline<S, M> {
    pub fn new(store: Arc<S>, media: Arc<M>, config: PipelineConfig) -> Self {
        Self {
            store,
            media,
            config: Arc::new(config),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Destination bucket and key for a request.
    pub fn destination(&self, request: &PreviewRequest) -> WorkerResult<(String, String)> {
        let bucket = self
            .config
            .output_bucket
            .clone()
            .unwrap_or_else(|| request.bucket.clone());
        let key = derive_output_key(
            &self.config.output_key_prefix,
            &request.key,
            self.config.output_format,
        )?;
        Ok((bucket, key))
    }

    /// Run the full pipeline for one source object.
    pub async fn run(&self, request: &PreviewRequest) -> WorkerResult<PreviewReport> {
        let logger = InvocationLogger::new(&request.key);
        let span = logger.create_span();
        let started = Instant::now();

        let result = async {
            logger.log_start(&format!("{}/{}", request.bucket, request.key));
            match self.options.timeout {
                Some(limit) => tokio::time::timeout(limit, self.execute(request, &logger))
                    .await
                    .unwrap_or(Err(WorkerError::Timeout(limit.as_secs()))),
                None => self.execute(request, &logger).await,
            }
        }
        .instrument(span)
        .await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(report) => {
                metrics::record_invocation("success", elapsed);
                logger.log_completion(&format!(
                    "{} bytes published to {}/{} in {:.2}s",
                    report.size, report.output_bucket, report.output_key, elapsed
                ));
            }
            Err(e) => {
                let kind = e.kind();
                metrics::record_invocation(kind.as_str(), elapsed);
                logger.log_state(PipelineState::Failed(kind));
                logger.log_error(&e.to_string());
            }
        }

        result
    }

    async fn execute(
        &self,
        request: &PreviewRequest,
        logger: &InvocationLogger,
    ) -> WorkerResult<PreviewReport> {
        let config = &*self.config;
        let (output_bucket, output_key) = self.destination(request)?;

        // Dropped on every exit path, including cancellation.
        let work = self.create_work_dir()?;
        debug!(work_dir = %work.path().display(), "Created invocation work directory");

        let mut state = PipelineState::Fetching;
        logger.log_state(state);
        let source = self.fetch(request, work.path()).await?;

        state = advance(state, logger);
        let duration = self
            .media
            .probe(&source.local_path)
            .await
            .map_err(WorkerError::from_probe)?;
        let source = source.with_duration(duration);

        state = advance(state, logger);
        let windows = plan_samples(duration, config.sample_count, config.sample_duration)
            .map_err(WorkerError::from_plan)?;
        debug!(
            duration,
            windows = windows.len(),
            "Planned {} sample window(s)",
            windows.len()
        );

        state = advance(state, logger);
        let samples_dir = work.path().join("samples");
        tokio::fs::create_dir_all(&samples_dir).await?;
        let (clips, failures) = self
            .extract_all(&source.local_path, &windows, &samples_dir, logger)
            .await;
        metrics::record_samples_failed(failures.len());

        if clips.is_empty() {
            let last_error = failures
                .last()
                .map(|f| f.error.clone())
                .unwrap_or_else(|| "no samples planned".to_string());
            return Err(WorkerError::AllSamplesFailed {
                attempted: windows.len(),
                last_error,
            });
        }
        if !failures.is_empty() {
            logger.log_warning(&format!(
                "Assembling {} of {} samples",
                clips.len(),
                windows.len()
            ));
        }

        state = advance(state, logger);
        let output_path = work
            .path()
            .join(format!("preview.{}", config.output_format.extension()));
        let preview_duration = self
            .media
            .assemble(&clips, &output_path, config)
            .await
            .map_err(|e| WorkerError::assembly_failed(e.to_string()))?;
        let size = match tokio::fs::metadata(&output_path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(WorkerError::assembly_failed("assembled preview is empty")),
        };
        if let Err(e) = tokio::fs::remove_dir_all(&samples_dir).await {
            logger.log_warning(&format!("Failed to remove intermediate samples: {}", e));
        }

        let artifact = PreviewArtifact {
            path: output_path,
            bucket: output_bucket,
            key: output_key,
            format: config.output_format,
            size,
        };

        state = advance(state, logger);
        self.publish(&artifact).await?;

        advance(state, logger);
        Ok(PreviewReport {
            invocation_id: logger.invocation_id().to_string(),
            source_bucket: source.bucket,
            source_key: source.key,
            output_bucket: artifact.bucket,
            output_key: artifact.key,
            format: artifact.format,
            source_duration: duration,
            preview_duration,
            succeeded: clips.iter().map(|c| c.index()).collect(),
            windows,
            failures,
            size: artifact.size,
        })
    }

    fn create_work_dir(&self) -> WorkerResult<tempfile::TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("preview-");
            builder
        };
        let dir = match &self.options.work_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn fetch(&self, request: &PreviewRequest, work_dir: &Path) -> WorkerResult<SourceVideo> {
        let extension = Path::new(&request.key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let local_path = work_dir.join(format!("source.{}", extension));

        let size = self
            .store
            .download_to_file(&request.bucket, &request.key, &local_path)
            .await
            .map_err(|e| WorkerError::source_unavailable(e.to_string()))?;

        Ok(SourceVideo::new(&request.bucket, &request.key, local_path, size))
    }

    /// Extract every window, at most `max_parallel` at a time.
    ///
    /// Returns the successful clips ordered by window index together with the
    /// failures, whatever order the extractions finished in.
    async fn extract_all(
        &self,
        source: &Path,
        windows: &[SampleWindow],
        samples_dir: &Path,
        logger: &InvocationLogger,
    ) -> (Vec<IntermediateClip>, Vec<SampleFailure>) {
        let semaphore = Semaphore::new(self.options.max_parallel.max(1));
        let config = &*self.config;

        let futures: Vec<_> = windows
            .iter()
            .map(|window| {
                let semaphore = &semaphore;
                async move {
                    let result = match semaphore.acquire().await {
                        Ok(_permit) => {
                            self.media
                                .extract(source, window, samples_dir, config)
                                .await
                        }
                        Err(_) => Err(MediaError::extraction_failed(
                            window.index,
                            "extraction cancelled",
                        )),
                    };
                    (window.index, result)
                }
            })
            .collect();

        let mut clips = Vec::with_capacity(windows.len());
        let mut failures = Vec::new();
        for (index, result) in join_all(futures).await {
            match result {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    logger.log_warning(&format!("Sample {} failed: {}", index, e));
                    failures.push(SampleFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        clips.sort_by_key(|clip| clip.index());
        failures.sort_by_key(|failure| failure.index);
        (clips, failures)
    }

    async fn publish(&self, artifact: &PreviewArtifact) -> WorkerResult<()> {
        self.store
            .upload_file(
                &artifact.bucket,
                &artifact.key,
                &artifact.path,
                artifact.content_type(),
            )
            .await
            .map_err(|e| WorkerError::publish_failed(e.to_string()))?;
        Ok(())
    }
}

fn advance(state: PipelineState, logger: &InvocationLogger) -> PipelineState {
    let next = state.next().unwrap_or(state);
    logger.log_state(next);
    next
}
