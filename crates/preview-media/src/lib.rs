#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for preview generation.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with timeouts and kill-on-drop
//! - Duration probing via FFprobe
//! - Time-based sample planning
//! - Per-window sample extraction to a canonical intermediate encoding
//! - Concat-demuxer assembly into the output container
//! - The `MediaToolchain` capability used by the pipeline orchestrator

pub mod assemble;
pub mod command;
pub mod error;
pub mod extract;
pub mod planner;
pub mod probe;
pub mod toolchain;

pub use assemble::{assemble_clips, build_concat_list, AssemblyOptions};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use extract::{extract_sample, intermediate_path, ExtractOptions};
pub use planner::plan_samples;
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use toolchain::{FfmpegToolchain, MediaToolchain};
