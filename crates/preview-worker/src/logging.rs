//! Structured invocation logging.
//!
//! Every log line of one invocation carries the invocation id and the
//! source key, so interleaved invocations can be told apart.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

use crate::pipeline::PipelineState;

/// Logger bound to one pipeline invocation.
#[derive(Debug, Clone)]
pub struct InvocationLogger {
    invocation_id: String,
    source_key: String,
}

impl InvocationLogger {
    /// Create a logger with a freshly generated invocation id.
    pub fn new(source_key: &str) -> Self {
        Self::with_id(&Uuid::new_v4().to_string(), source_key)
    }

    pub fn with_id(invocation_id: &str, source_key: &str) -> Self {
        Self {
            invocation_id: invocation_id.to_string(),
            source_key: source_key.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            invocation_id = %self.invocation_id,
            source_key = %self.source_key,
            "Invocation started: {}", message
        );
    }

    /// Log a state machine transition.
    pub fn log_state(&self, state: PipelineState) {
        info!(
            invocation_id = %self.invocation_id,
            source_key = %self.source_key,
            state = %state,
            "Pipeline state: {}", state
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            invocation_id = %self.invocation_id,
            source_key = %self.source_key,
            "Invocation warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            invocation_id = %self.invocation_id,
            source_key = %self.source_key,
            "Invocation error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            invocation_id = %self.invocation_id,
            source_key = %self.source_key,
            "Invocation completed: {}", message
        );
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Span covering the whole invocation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "invocation",
            invocation_id = %self.invocation_id,
            source_key = %self.source_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = InvocationLogger::new("videos/a.mp4");
        let b = InvocationLogger::new("videos/a.mp4");
        assert_ne!(a.invocation_id(), b.invocation_id());
        assert_eq!(a.source_key, "videos/a.mp4");
    }

    #[test]
    fn test_with_id() {
        let logger = InvocationLogger::with_id("inv-123", "clip.mp4");
        assert_eq!(logger.invocation_id(), "inv-123");
        assert_eq!(logger.source_key, "clip.mp4");
    }
}
