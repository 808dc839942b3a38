//! Invocation metrics.
//!
//! Only the `metrics` facade is used here; installing a recorder is left to
//! the environment running the worker.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const INVOCATIONS_TOTAL: &str = "preview_invocations_total";
    pub const INVOCATION_SECONDS: &str = "preview_invocation_seconds";
    pub const SAMPLES_FAILED_TOTAL: &str = "preview_samples_failed_total";
}

/// Record a finished invocation. `outcome` is `success` or a failure kind.
pub fn record_invocation(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];

    counter!(names::INVOCATIONS_TOTAL, &labels).increment(1);
    histogram!(names::INVOCATION_SECONDS, &labels).record(duration_secs);
}

/// Record samples dropped from a preview.
pub fn record_samples_failed(count: usize) {
    if count > 0 {
        counter!(names::SAMPLES_FAILED_TOTAL).increment(count as u64);
    }
}
