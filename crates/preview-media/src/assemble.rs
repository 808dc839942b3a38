//! Preview assembly with the FFmpeg concat demuxer.
//!
//! Samples are joined strictly in plan order. Containers that accept H.264
//! take the streams as-is; the rest are re-encoded.

use std::path::Path;
use tracing::{debug, info, warn};

use preview_models::{IntermediateClip, OutputFormat};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// VP9 quality for WebM previews
const WEBM_CRF: u8 = 33;
/// Frame rate of GIF previews
const GIF_FPS: u32 = 12;

/// Settings for one assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    /// Output container
    pub format: OutputFormat,
    /// Samples carry audio
    pub include_audio: bool,
    /// Per-process timeout
    pub timeout_secs: Option<u64>,
    /// FFmpeg log level
    pub log_level: Option<String>,
}

/// Render a concat demuxer list for `clips` in the given order.
pub fn build_concat_list(clips: &[&IntermediateClip]) -> String {
    clips
        .iter()
        .map(|clip| {
            let path = clip.path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", path)
        })
        .collect()
}

/// Clips ordered by plan index, whatever order they were produced in.
pub fn ordered_clips(clips: &[IntermediateClip]) -> Vec<&IntermediateClip> {
    let mut ordered: Vec<&IntermediateClip> = clips.iter().collect();
    ordered.sort_by_key(|clip| clip.index());
    ordered
}

/// Build the concat command for `format`.
pub fn build_assemble_command(
    list_path: &Path,
    output: &Path,
    options: &AssemblyOptions,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(list_path, output)
        .input_format("concat")
        .input_arg("-safe")
        .input_arg("0");

    let keep_audio = options.include_audio && options.format.supports_audio();

    cmd = match options.format {
        format if format.supports_stream_copy() => {
            let cmd = cmd.codec_copy();
            if format.wants_faststart() {
                cmd.output_arg("-movflags").output_arg("+faststart")
            } else {
                cmd
            }
        }
        OutputFormat::Webm => {
            let cmd = cmd
                .video_codec("libvpx-vp9")
                .output_arg("-b:v")
                .output_arg("0")
                .output_arg("-crf")
                .output_arg(WEBM_CRF.to_string());
            if keep_audio {
                cmd.audio_codec("libopus").output_arg("-b:a").output_arg("96k")
            } else {
                cmd.no_audio()
            }
        }
        _ => cmd
            .video_filter(format!("fps={}", GIF_FPS))
            .no_audio()
            .output_arg("-loop")
            .output_arg("0"),
    };

    if let Some(level) = &options.log_level {
        cmd = cmd.log_level(level);
    }

    cmd
}

/// Concatenate `clips` (sorted by index) into `output`.
///
/// Returns the assembled duration. A toolchain error or a zero-length
/// result is [`MediaError::AssemblyFailed`].
pub async fn assemble_clips(
    clips: &[IntermediateClip],
    output: &Path,
    options: &AssemblyOptions,
) -> MediaResult<f64> {
    if clips.is_empty() {
        return Err(MediaError::assembly_failed("no samples to assemble"));
    }

    let ordered = ordered_clips(clips);
    let list_path = output.with_extension("concat.txt");
    tokio::fs::write(&list_path, build_concat_list(&ordered)).await?;

    info!(
        samples = ordered.len(),
        format = %options.format,
        output = %output.display(),
        "Assembling preview"
    );

    let cmd = build_assemble_command(&list_path, output, options);
    let mut runner = FfmpegRunner::new();
    if let Some(secs) = options.timeout_secs {
        runner = runner.with_timeout(secs);
    }
    let run_result = runner.run(&cmd).await;

    if let Err(e) = tokio::fs::remove_file(&list_path).await {
        warn!("Failed to remove concat list {}: {}", list_path.display(), e);
    }

    run_result.map_err(|e| match e.stderr_summary() {
        Some(line) => MediaError::assembly_failed(format!("{}: {}", e, line)),
        None => MediaError::assembly_failed(e.to_string()),
    })?;

    let duration = probe_duration(output, options.timeout_secs)
        .await
        .map_err(|e| MediaError::assembly_failed(format!("assembled file unreadable: {}", e)))?;

    if duration <= 0.0 {
        return Err(MediaError::assembly_failed("assembled preview has zero duration"));
    }

    debug!(duration, "Preview assembled");
    Ok(duration)
}
