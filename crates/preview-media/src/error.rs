//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),

    #[error("Source video has no duration")]
    EmptySource,

    #[error("Invalid sample plan: {0}")]
    InvalidPlan(String),

    #[error("Extraction of sample {index} failed: {message}")]
    ExtractionFailed { index: u32, message: String },

    #[error("Assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::UnreadableMedia(message.into())
    }

    pub fn extraction_failed(index: u32, message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            index,
            message: message.into(),
        }
    }

    pub fn assembly_failed(message: impl Into<String>) -> Self {
        Self::AssemblyFailed(message.into())
    }

    /// Last non-empty stderr line, if the error carries toolchain output.
    pub fn stderr_summary(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } => stderr.lines().rev().find(|line| !line.trim().is_empty()),
            _ => None,
        }
    }

    /// Whether the binaries themselves are missing (environment problem, not input problem).
    pub fn is_toolchain_missing(&self) -> bool {
        matches!(self, MediaError::FfmpegNotFound | MediaError::FfprobeNotFound)
    }
}
