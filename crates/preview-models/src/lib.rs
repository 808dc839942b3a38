//! Shared data models for the video preview pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Pipeline configuration and output formats
//! - Sample windows and intermediate clips
//! - Preview artifacts and destination key derivation
//! - Storage trigger events

pub mod config;
pub mod encoding;
pub mod error;
pub mod event;
pub mod format;
pub mod video;
pub mod window;

// Re-export common types
pub use config::PipelineConfig;
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use event::{ObjectCreated, StorageEvent};
pub use format::OutputFormat;
pub use video::{derive_output_key, key_stem, IntermediateClip, PreviewArtifact, SourceVideo};
pub use window::SampleWindow;
