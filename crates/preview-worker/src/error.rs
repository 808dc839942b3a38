//! Worker error types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use preview_media::MediaError;
use preview_models::ModelError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Why an invocation ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    UnreadableMedia,
    EmptySource,
    AllSamplesFailed,
    AssemblyFailed,
    PublishFailed,
    InvalidEvent,
    Config,
    Toolchain,
    Timeout,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SourceUnavailable => "source_unavailable",
            FailureKind::UnreadableMedia => "unreadable_media",
            FailureKind::EmptySource => "empty_source",
            FailureKind::AllSamplesFailed => "all_samples_failed",
            FailureKind::AssemblyFailed => "assembly_failed",
            FailureKind::PublishFailed => "publish_failed",
            FailureKind::InvalidEvent => "invalid_event",
            FailureKind::Config => "config",
            FailureKind::Toolchain => "toolchain",
            FailureKind::Timeout => "timeout",
            FailureKind::Internal => "internal",
        }
    }

    /// Only a failed write of a fully assembled preview is worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::PublishFailed)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),

    #[error("Source video has zero duration")]
    EmptySource,

    #[error("All {attempted} samples failed: {last_error}")]
    AllSamplesFailed { attempted: usize, last_error: String },

    #[error("Assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media toolchain unavailable: {0}")]
    Toolchain(String),

    #[error("Invocation timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::UnreadableMedia(msg.into())
    }

    pub fn assembly_failed(msg: impl Into<String>) -> Self {
        Self::AssemblyFailed(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerError::SourceUnavailable(_) => FailureKind::SourceUnavailable,
            WorkerError::UnreadableMedia(_) => FailureKind::UnreadableMedia,
            WorkerError::EmptySource => FailureKind::EmptySource,
            WorkerError::AllSamplesFailed { .. } => FailureKind::AllSamplesFailed,
            WorkerError::AssemblyFailed(_) => FailureKind::AssemblyFailed,
            WorkerError::PublishFailed(_) => FailureKind::PublishFailed,
            WorkerError::InvalidEvent(_) => FailureKind::InvalidEvent,
            WorkerError::ConfigError(_) => FailureKind::Config,
            WorkerError::Toolchain(_) => FailureKind::Toolchain,
            WorkerError::Timeout(_) => FailureKind::Timeout,
            WorkerError::Io(_) => FailureKind::Internal,
        }
    }

    /// Check if the invoking layer should run the invocation again.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Classify an error raised while probing the source.
    pub fn from_probe(error: MediaError) -> Self {
        match error {
            e if e.is_toolchain_missing() => WorkerError::Toolchain(e.to_string()),
            MediaError::EmptySource => WorkerError::EmptySource,
            MediaError::UnreadableMedia(msg) => WorkerError::UnreadableMedia(msg),
            other => WorkerError::UnreadableMedia(other.to_string()),
        }
    }

    /// Classify an error raised by the sample planner.
    pub fn from_plan(error: MediaError) -> Self {
        match error {
            MediaError::EmptySource => WorkerError::EmptySource,
            other => WorkerError::ConfigError(other.to_string()),
        }
    }
}

impl From<ModelError> for WorkerError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::InvalidEvent(msg) => WorkerError::InvalidEvent(msg),
            ModelError::Json(e) => WorkerError::InvalidEvent(e.to_string()),
            other => WorkerError::ConfigError(other.to_string()),
        }
    }
}
