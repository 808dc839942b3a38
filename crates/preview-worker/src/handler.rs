//! Storage event handler.
//!
//! Validates the trigger event, applies the key suffix filter and turns the
//! pipeline outcome into the JSON response returned to the invoker.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use preview_media::MediaToolchain;
use preview_models::{ObjectCreated, StorageEvent};
use preview_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::error::{FailureKind, WorkerError, WorkerResult};
use crate::pipeline::{PipelineOptions, PreviewPipeline, PreviewReport, PreviewRequest};

/// Response body fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

/// Invoker-facing result of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn success(report: &PreviewReport) -> Self {
        let message = if report.failures.is_empty() {
            "Preview created".to_string()
        } else {
            format!(
                "Preview created from {} of {} samples",
                report.succeeded.len(),
                report.windows.len()
            )
        };
        Self {
            status_code: 200,
            body: ResponseBody {
                message,
                input_key: Some(report.source_key.clone()),
                output_key: Some(report.output_key.clone()),
                bucket: Some(report.output_bucket.clone()),
                error_kind: None,
            },
        }
    }

    pub fn skipped(object: &ObjectCreated, reason: &str) -> Self {
        Self {
            status_code: 204,
            body: ResponseBody {
                message: format!("Skipped: {}", reason),
                input_key: Some(object.key.clone()),
                output_key: None,
                bucket: Some(object.bucket.clone()),
                error_kind: None,
            },
        }
    }

    /// Response for a failed invocation. Client errors map to 400.
    pub fn failure(error: &WorkerError) -> Self {
        let status_code = match error.kind() {
            FailureKind::InvalidEvent => 400,
            FailureKind::UnreadableMedia | FailureKind::EmptySource => 422,
            FailureKind::SourceUnavailable => 404,
            FailureKind::Timeout => 504,
            _ => 500,
        };
        Self {
            status_code,
            body: ResponseBody {
                message: error.to_string(),
                input_key: None,
                output_key: None,
                bucket: None,
                error_kind: Some(error.kind()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{{\"statusCode\":{},\"body\":{{}}}}", self.status_code)
        })
    }
}

/// Entry point for one storage event.
pub struct PreviewHandler<S, M> {
    pipeline: PreviewPipeline<S, M>,
    suffix_filter: String,
}

impl<S: ObjectStore, M: MediaToolchain> PreviewHandler<S, M> {
    pub fn new(pipeline: PreviewPipeline<S, M>, suffix_filter: impl Into<String>) -> Self {
        Self {
            pipeline,
            suffix_filter: suffix_filter.into(),
        }
    }

    /// Wire a handler from worker configuration.
    pub fn from_config(store: Arc<S>, media: Arc<M>, config: &WorkerConfig) -> Self {
        let pipeline = PreviewPipeline::new(store, media, config.pipeline.clone()).with_options(
            PipelineOptions {
                work_dir: config.work_dir.clone(),
                max_parallel: config.max_parallel,
                timeout: Some(config.invocation_timeout),
            },
        );
        Self::new(pipeline, config.suffix_filter.clone())
    }

    /// Handle a raw JSON event.
    pub async fn handle_json(&self, raw: &[u8]) -> WorkerResult<HandlerResponse> {
        let event = StorageEvent::from_slice(raw)?;
        self.handle(&event).await
    }

    pub async fn handle(&self, event: &StorageEvent) -> WorkerResult<HandlerResponse> {
        let object = event.single_object()?;

        if !object.matches_suffix(&self.suffix_filter) {
            info!(
                bucket = %object.bucket,
                key = %object.key,
                suffix = %self.suffix_filter,
                "Skipping object without matching suffix"
            );
            let reason = format!("key does not end with {:?}", self.suffix_filter);
            return Ok(HandlerResponse::skipped(&object, &reason));
        }

        let request = PreviewRequest::new(object.bucket.clone(), object.key.clone());
        if self.is_own_output(&request)? {
            info!(
                bucket = %object.bucket,
                key = %object.key,
                "Skipping object written by this worker"
            );
            return Ok(HandlerResponse::skipped(&object, "key is a preview output"));
        }

        let report = self.pipeline.run(&request).await?;
        Ok(HandlerResponse::success(&report))
    }

    /// Whether `request` names a preview, or would be overwritten by its own.
    ///
    /// Previews land in the watched bucket when no output bucket is set;
    /// processing them would replace uploads and re-trigger forever.
    fn is_own_output(&self, request: &PreviewRequest) -> WorkerResult<bool> {
        let (bucket, key) = self.pipeline.destination(request)?;
        if bucket != request.bucket {
            return Ok(false);
        }

        let prefix = self.pipeline.config().output_key_prefix.trim_matches('/');
        let under_prefix = !prefix.is_empty()
            && request
                .key
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
        Ok(under_prefix || key == request.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_response() {
        let object = ObjectCreated {
            bucket: "media".into(),
            key: "notes.txt".into(),
            size: None,
        };
        let response = HandlerResponse::skipped(&object, "key does not end with \".mp4\"");
        assert_eq!(response.status_code, 204);
        assert!(response.is_success());

        let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["statusCode"], 204);
        assert_eq!(json["body"]["input_key"], "notes.txt");
        assert!(json["body"].get("output_key").is_none());
    }

    #[test]
    fn test_failure_response() {
        let response = HandlerResponse::failure(&WorkerError::publish_failed("503 Slow Down"));
        assert_eq!(response.status_code, 500);
        assert!(!response.is_success());

        let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["body"]["error_kind"], "publish_failed");

        let response = HandlerResponse::failure(&WorkerError::invalid_event("no records"));
        assert_eq!(response.status_code, 400);
    }
}
