//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use preview_models::{OutputFormat, PipelineConfig};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Settings handed to every pipeline run
    pub pipeline: PipelineConfig,
    /// Only keys ending with this suffix are processed (case-insensitive)
    pub suffix_filter: String,
    /// Debug logging and verbose FFmpeg output
    pub debug: bool,
    /// Root for per-invocation temporary directories
    pub work_dir: Option<PathBuf>,
    /// Maximum concurrent sample extractions
    pub max_parallel: usize,
    /// Whole-invocation timeout
    pub invocation_timeout: Duration,
    /// Per FFmpeg process timeout
    pub ffmpeg_timeout: Duration,
    /// Extra attempts for retryable failures
    pub publish_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            suffix_filter: ".mp4".to_string(),
            debug: false,
            work_dir: None,
            max_parallel: 4,
            invocation_timeout: Duration::from_secs(300),
            ffmpeg_timeout: Duration::from_secs(120),
            publish_retries: 2,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable source.
    ///
    /// Unset or blank variables take their defaults; values that are set but
    /// cannot be parsed are configuration errors.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let pipeline = PipelineConfig {
            sample_count: parse_var(get("PREVIEW_SAMPLES"), "PREVIEW_SAMPLES", defaults.pipeline.sample_count)?,
            sample_duration: parse_var(
                get("PREVIEW_SAMPLE_DURATION"),
                "PREVIEW_SAMPLE_DURATION",
                defaults.pipeline.sample_duration,
            )?,
            output_format: match get("PREVIEW_FORMAT") {
                Some(value) => OutputFormat::from_str(&value)?,
                None => defaults.pipeline.output_format,
            },
            output_key_prefix: lookup("PREVIEW_OUTPUT_PREFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.pipeline.output_key_prefix),
            output_bucket: get("PREVIEW_OUTPUT_BUCKET"),
            scale: get("PREVIEW_SCALE"),
            include_audio: parse_flag(get("PREVIEW_INCLUDE_AUDIO"), "PREVIEW_INCLUDE_AUDIO", false)?,
        };
        pipeline.validate()?;

        let max_parallel = parse_var(get("PREVIEW_MAX_PARALLEL"), "PREVIEW_MAX_PARALLEL", defaults.max_parallel)?;
        if max_parallel == 0 {
            return Err(WorkerError::config_error("PREVIEW_MAX_PARALLEL must be at least 1"));
        }

        let invocation_timeout = parse_secs(
            get("PREVIEW_TIMEOUT_SECS"),
            "PREVIEW_TIMEOUT_SECS",
            defaults.invocation_timeout,
        )?;
        let ffmpeg_timeout = parse_secs(
            get("PREVIEW_FFMPEG_TIMEOUT_SECS"),
            "PREVIEW_FFMPEG_TIMEOUT_SECS",
            defaults.ffmpeg_timeout,
        )?;

        Ok(Self {
            pipeline,
            suffix_filter: lookup("PREVIEW_SUFFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.suffix_filter),
            debug: parse_flag(get("PREVIEW_DEBUG"), "PREVIEW_DEBUG", false)?,
            work_dir: get("PREVIEW_WORK_DIR").map(PathBuf::from),
            max_parallel,
            invocation_timeout,
            ffmpeg_timeout,
            publish_retries: parse_var(
                get("PREVIEW_PUBLISH_RETRIES"),
                "PREVIEW_PUBLISH_RETRIES",
                defaults.publish_retries,
            )?,
        })
    }
}

/// Read `PREVIEW_DEBUG` leniently, for logging setup before full validation.
pub fn debug_from_env() -> bool {
    std::env::var("PREVIEW_DEBUG")
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false)
}

fn parse_var<T: FromStr>(value: Option<String>, name: &str, default: T) -> WorkerResult<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| WorkerError::config_error(format!("{} has invalid value {:?}", name, raw))),
        None => Ok(default),
    }
}

fn parse_secs(value: Option<String>, name: &str, default: Duration) -> WorkerResult<Duration> {
    let secs: u64 = parse_var(value, name, default.as_secs())?;
    if secs == 0 {
        return Err(WorkerError::config_error(format!("{} must be at least 1", name)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_flag(value: Option<String>, name: &str, default: bool) -> WorkerResult<bool> {
    match value {
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| WorkerError::config_error(format!("{} has invalid value {:?}", name, raw))),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> WorkerResult<WorkerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.pipeline.sample_count, 4);
        assert_eq!(config.pipeline.output_key_prefix, "output");
        assert_eq!(config.suffix_filter, ".mp4");
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.invocation_timeout, Duration::from_secs(300));
        assert_eq!(config.publish_retries, 2);
        assert!(!config.debug);
        assert!(config.work_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PREVIEW_SAMPLES", "6"),
            ("PREVIEW_SAMPLE_DURATION", "1.5"),
            ("PREVIEW_FORMAT", "webm"),
            ("PREVIEW_OUTPUT_PREFIX", "previews/"),
            ("PREVIEW_OUTPUT_BUCKET", "thumbs"),
            ("PREVIEW_SCALE", "480:-2"),
            ("PREVIEW_INCLUDE_AUDIO", "yes"),
            ("PREVIEW_SUFFIX", ".MOV"),
            ("PREVIEW_DEBUG", "1"),
            ("PREVIEW_WORK_DIR", "/scratch"),
            ("PREVIEW_MAX_PARALLEL", "2"),
            ("PREVIEW_TIMEOUT_SECS", "60"),
            ("PREVIEW_PUBLISH_RETRIES", "0"),
        ])
        .unwrap();

        assert_eq!(config.pipeline.sample_count, 6);
        assert_eq!(config.pipeline.sample_duration, 1.5);
        assert_eq!(config.pipeline.output_format, OutputFormat::Webm);
        assert_eq!(config.pipeline.output_key_prefix, "previews/");
        assert_eq!(config.pipeline.output_bucket.as_deref(), Some("thumbs"));
        assert_eq!(config.pipeline.scale.as_deref(), Some("480:-2"));
        assert!(config.pipeline.include_audio);
        assert_eq!(config.suffix_filter, ".MOV");
        assert!(config.debug);
        assert_eq!(config.work_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.invocation_timeout, Duration::from_secs(60));
        assert_eq!(config.publish_retries, 0);
    }

    #[test]
    fn test_empty_prefix_and_suffix_are_allowed() {
        let config = config_from(&[("PREVIEW_OUTPUT_PREFIX", ""), ("PREVIEW_SUFFIX", "")]).unwrap();
        assert_eq!(config.pipeline.output_key_prefix, "");
        assert_eq!(config.suffix_filter, "");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases: &[(&str, &str)] = &[
            ("PREVIEW_SAMPLES", "0"),
            ("PREVIEW_SAMPLES", "four"),
            ("PREVIEW_SAMPLE_DURATION", "-2"),
            ("PREVIEW_SAMPLE_DURATION", "NaN"),
            ("PREVIEW_FORMAT", "avi"),
            ("PREVIEW_INCLUDE_AUDIO", "maybe"),
            ("PREVIEW_MAX_PARALLEL", "0"),
            ("PREVIEW_TIMEOUT_SECS", "0"),
            ("PREVIEW_SCALE", "480:-2,hflip"),
        ];
        for (name, value) in cases {
            let err = config_from(&[(name, value)]).unwrap_err();
            assert_eq!(err.kind(), FailureKind::Config, "{}={} should be rejected", name, value);
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
