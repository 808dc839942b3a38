//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::format::OutputFormat;

/// Default number of samples per preview
pub const DEFAULT_SAMPLE_COUNT: u32 = 4;
/// Default sample length in seconds
pub const DEFAULT_SAMPLE_DURATION: f64 = 2.0;
/// Default destination key prefix
pub const DEFAULT_OUTPUT_PREFIX: &str = "output";

/// Immutable per-invocation settings for the preview pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of samples to take (>= 1)
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,

    /// Length of each sample in seconds (> 0)
    #[serde(default = "default_sample_duration")]
    pub sample_duration: f64,

    /// Container of the assembled preview
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Destination key prefix
    #[serde(default = "default_output_prefix")]
    pub output_key_prefix: String,

    /// Destination bucket (defaults to the source bucket)
    #[serde(default)]
    pub output_bucket: Option<String>,

    /// Optional FFmpeg scale expression, e.g. "480:-2"
    #[serde(default)]
    pub scale: Option<String>,

    /// Keep the source audio track in the preview
    #[serde(default)]
    pub include_audio: bool,
}

fn default_sample_count() -> u32 {
    DEFAULT_SAMPLE_COUNT
}
fn default_sample_duration() -> f64 {
    DEFAULT_SAMPLE_DURATION
}
fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_duration: DEFAULT_SAMPLE_DURATION,
            output_format: OutputFormat::default(),
            output_key_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            output_bucket: None,
            scale: None,
            include_audio: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_samples(mut self, sample_count: u32, sample_duration: f64) -> Self {
        self.sample_count = sample_count;
        self.sample_duration = sample_duration;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_key_prefix = prefix.into();
        self
    }

    pub fn with_output_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.output_bucket = Some(bucket.into());
        self
    }

    /// Check the numeric invariants.
    pub fn validate(&self) -> ModelResult<()> {
        if self.sample_count == 0 {
            return Err(ModelError::invalid_config("sample count must be at least 1"));
        }
        if !self.sample_duration.is_finite() || self.sample_duration <= 0.0 {
            return Err(ModelError::invalid_config(format!(
                "sample duration must be a positive number of seconds, got {}",
                self.sample_duration
            )));
        }
        if let Some(scale) = &self.scale {
            if scale.trim().is_empty() || scale.contains(',') || scale.contains(';') {
                return Err(ModelError::invalid_config(format!(
                    "scale must be a single width:height expression, got {:?}",
                    scale
                )));
            }
        }
        Ok(())
    }

    /// Whether the assembled preview will carry audio.
    pub fn keeps_audio(&self) -> bool {
        self.include_audio && self.output_format.supports_audio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_count, 4);
        assert!((config.sample_duration - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_zero_samples() {
        let config = PipelineConfig::default().with_samples(0, 2.0);
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(PipelineConfig::default().with_samples(4, 0.0).validate().is_err());
        assert!(PipelineConfig::default().with_samples(4, -1.0).validate().is_err());
        assert!(PipelineConfig::default()
            .with_samples(4, f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_rejects_filter_injection_in_scale() {
        let config = PipelineConfig {
            scale: Some("480:-2,hflip".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gif_drops_audio() {
        let config = PipelineConfig {
            include_audio: true,
            ..Default::default()
        }
        .with_format(OutputFormat::Gif);
        assert!(!config.keeps_audio());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"sample_count": 6, "output_format": "webm"}"#).unwrap();
        assert_eq!(config.sample_count, 6);
        assert_eq!(config.output_format, OutputFormat::Webm);
        assert_eq!(config.output_key_prefix, "output");
        assert!((config.sample_duration - 2.0).abs() < f64::EPSILON);
    }
}
