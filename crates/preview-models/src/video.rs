//! Source video, intermediate clip and preview artifact types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ModelError, ModelResult};
use crate::format::OutputFormat;
use crate::window::SampleWindow;

/// The uploaded video being previewed.
///
/// Owned by one invocation; the local copy lives in the invocation's
/// temporary directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideo {
    /// Source bucket
    pub bucket: String,
    /// Source object key
    pub key: String,
    /// Local copy of the object
    pub local_path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Probed duration in seconds (set once by the prober)
    pub duration: Option<f64>,
}

impl SourceVideo {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        local_path: impl Into<PathBuf>,
        size: u64,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            local_path: local_path.into(),
            size,
            duration: None,
        }
    }

    /// Record the probed duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// A sample extracted to the canonical intermediate encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateClip {
    /// Window this clip was cut from
    pub window: SampleWindow,
    /// Local file path
    pub path: PathBuf,
}

impl IntermediateClip {
    pub fn new(window: SampleWindow, path: impl Into<PathBuf>) -> Self {
        Self {
            window,
            path: path.into(),
        }
    }

    /// Plan index of the source window.
    pub fn index(&self) -> u32 {
        self.window.index
    }
}

/// The assembled preview, ready to publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewArtifact {
    /// Local assembled file
    pub path: PathBuf,
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
    /// Container format
    pub format: OutputFormat,
    /// Size in bytes
    pub size: u64,
}

impl PreviewArtifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// File name of `key` without its directory and final extension.
///
/// `"uploads/My Clip.final.mp4"` -> `"My Clip.final"`.
pub fn key_stem(key: &str) -> Option<&str> {
    let name = key.rsplit('/').next().unwrap_or(key);
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    };
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Destination key for the preview of `source_key`:
/// `{prefix}/{stem}.{format}`.
pub fn derive_output_key(prefix: &str, source_key: &str, format: OutputFormat) -> ModelResult<String> {
    let stem = key_stem(source_key).ok_or_else(|| {
        ModelError::invalid_event(format!("object key {:?} has no file name", source_key))
    })?;

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(format!("{}.{}", stem, format.extension()))
    } else {
        Ok(format!("{}/{}.{}", prefix, stem, format.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stem() {
        assert_eq!(key_stem("video.mp4"), Some("video"));
        assert_eq!(key_stem("uploads/2024/clip.final.mov"), Some("clip.final"));
        assert_eq!(key_stem("noext"), Some("noext"));
        assert_eq!(key_stem(".hidden"), Some(".hidden"));
        assert_eq!(key_stem("folder/"), None);
    }

    #[test]
    fn test_derive_output_key() {
        assert_eq!(
            derive_output_key("output", "input/My Video.mp4", OutputFormat::Mp4).unwrap(),
            "output/My Video.mp4"
        );
        assert_eq!(
            derive_output_key("previews/", "a.mkv", OutputFormat::Webm).unwrap(),
            "previews/a.webm"
        );
        assert_eq!(
            derive_output_key("", "a.mp4", OutputFormat::Gif).unwrap(),
            "a.gif"
        );
    }

    #[test]
    fn test_derive_output_key_is_deterministic() {
        let first = derive_output_key("output", "x/y/z.mp4", OutputFormat::Mp4).unwrap();
        let second = derive_output_key("output", "x/y/z.mp4", OutputFormat::Mp4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_derive_output_key_rejects_directory_key() {
        assert!(matches!(
            derive_output_key("output", "uploads/", OutputFormat::Mp4),
            Err(ModelError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_source_video_duration() {
        let video = SourceVideo::new("bucket", "a.mp4", "/tmp/a.mp4", 1024).with_duration(12.5);
        assert_eq!(video.duration, Some(12.5));
    }
}
