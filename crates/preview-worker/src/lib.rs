//! Video preview worker.
//!
//! Turns one storage upload event into one published preview: fetch the
//! source, probe it, plan sample windows, extract and assemble the samples,
//! then write the result back to object storage.

pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{FailureKind, WorkerError, WorkerResult};
pub use handler::{HandlerResponse, PreviewHandler};
pub use logging::InvocationLogger;
pub use pipeline::{
    PipelineOptions, PipelineState, PreviewPipeline, PreviewReport, PreviewRequest, SampleFailure,
};
pub use retry::{retry_async, RetryConfig, RetryResult};
