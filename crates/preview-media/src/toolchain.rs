//! The media capability used by the pipeline.
//!
//! The orchestrator only sees [`MediaToolchain`]; [`FfmpegToolchain`] is the
//! production implementation shelling out to FFmpeg and FFprobe.

use async_trait::async_trait;
use std::path::Path;

use preview_models::{EncodingConfig, IntermediateClip, PipelineConfig, SampleWindow};

use crate::assemble::{assemble_clips, AssemblyOptions};
use crate::command::{check_ffmpeg, check_ffprobe};
use crate::error::MediaResult;
use crate::extract::{extract_sample, ExtractOptions};
use crate::probe::probe_duration;

/// Probe, extract and assemble operations over local files.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Duration of the video at `path` in seconds.
    async fn probe(&self, path: &Path) -> MediaResult<f64>;

    /// Cut `window` from `source` into a new file under `work_dir`.
    async fn extract(
        &self,
        source: &Path,
        window: &SampleWindow,
        work_dir: &Path,
        config: &PipelineConfig,
    ) -> MediaResult<IntermediateClip>;

    /// Join `clips` in index order into `output`; returns the output duration.
    async fn assemble(
        &self,
        clips: &[IntermediateClip],
        output: &Path,
        config: &PipelineConfig,
    ) -> MediaResult<f64>;
}

/// FFmpeg/FFprobe CLI toolchain.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolchain {
    encoding: EncodingConfig,
    timeout_secs: Option<u64>,
    verbose: bool,
}

impl FfmpegToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any single FFmpeg or FFprobe process running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Let FFmpeg log at `info` instead of `error`.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fail fast when either binary is missing from PATH.
    pub fn check_available(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }

    fn log_level(&self) -> Option<String> {
        self.verbose.then(|| "info".to_string())
    }

    fn extract_options(&self, config: &PipelineConfig) -> ExtractOptions {
        ExtractOptions {
            encoding: self.encoding.clone(),
            scale: config.scale.clone(),
            include_audio: config.keeps_audio(),
            timeout_secs: self.timeout_secs,
            log_level: self.log_level(),
        }
    }

    fn assembly_options(&self, config: &PipelineConfig) -> AssemblyOptions {
        AssemblyOptions {
            format: config.output_format,
            include_audio: config.keeps_audio(),
            timeout_secs: self.timeout_secs,
            log_level: self.log_level(),
        }
    }
}

#[async_trait]
impl MediaToolchain for FfmpegToolchain {
    async fn probe(&self, path: &Path) -> MediaResult<f64> {
        probe_duration(path, self.timeout_secs).await
    }

    async fn extract(
        &self,
        source: &Path,
        window: &SampleWindow,
        work_dir: &Path,
        config: &PipelineConfig,
    ) -> MediaResult<IntermediateClip> {
        extract_sample(source, window, work_dir, &self.extract_options(config)).await
    }

    async fn assemble(
        &self,
        clips: &[IntermediateClip],
        output: &Path,
        config: &PipelineConfig,
    ) -> MediaResult<f64> {
        assemble_clips(clips, output, &self.assembly_options(config)).await
    }
}
