//! Output container formats for assembled previews.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Container format of the assembled preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MPEG-4 (H.264 stream copy)
    #[default]
    Mp4,
    /// QuickTime (H.264 stream copy)
    Mov,
    /// Matroska (H.264 stream copy)
    Mkv,
    /// WebM (re-encoded to VP9/Opus)
    Webm,
    /// Animated GIF (re-encoded, no audio)
    Gif,
}

impl OutputFormat {
    /// All supported formats.
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Mp4,
        OutputFormat::Mov,
        OutputFormat::Mkv,
        OutputFormat::Webm,
        OutputFormat::Gif,
    ];

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mov => "mov",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
        }
    }

    /// MIME type used when publishing the artifact.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Mov => "video/quicktime",
            OutputFormat::Mkv => "video/x-matroska",
            OutputFormat::Webm => "video/webm",
            OutputFormat::Gif => "image/gif",
        }
    }

    /// Whether canonical H.264/AAC intermediates can be stream-copied into
    /// this container.
    pub fn supports_stream_copy(&self) -> bool {
        matches!(self, OutputFormat::Mp4 | OutputFormat::Mov | OutputFormat::Mkv)
    }

    /// Whether the container carries an audio track.
    pub fn supports_audio(&self) -> bool {
        !matches!(self, OutputFormat::Gif)
    }

    /// Whether the moov atom should be moved to the front for progressive playback.
    pub fn wants_faststart(&self) -> bool {
        matches!(self, OutputFormat::Mp4 | OutputFormat::Mov)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "mp4" | "m4v" => Ok(OutputFormat::Mp4),
            "mov" => Ok(OutputFormat::Mov),
            "mkv" => Ok(OutputFormat::Mkv),
            "webm" => Ok(OutputFormat::Webm),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(ModelError::UnsupportedFormat(s.to_string())),
        }
    }
}
