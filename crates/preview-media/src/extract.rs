//! Sample extraction.
//!
//! Each window is cut from the source and re-encoded to the canonical
//! intermediate encoding (H.264 in MPEG-TS) so that every sample shares the
//! same codec parameters and the assembler can join them with the concat
//! demuxer.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use preview_models::encoding::{INTERMEDIATE_CONTAINER, INTERMEDIATE_EXTENSION};
use preview_models::{EncodingConfig, IntermediateClip, SampleWindow};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Settings shared by every extraction of one invocation.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Intermediate encoding
    pub encoding: EncodingConfig,
    /// Optional scale expression (`width:height`)
    pub scale: Option<String>,
    /// Keep the first audio track
    pub include_audio: bool,
    /// Per-process timeout
    pub timeout_secs: Option<u64>,
    /// FFmpeg log level
    pub log_level: Option<String>,
}

/// Path of the intermediate file for window `index`.
pub fn intermediate_path(work_dir: &Path, index: u32) -> PathBuf {
    work_dir.join(format!("sample_{:04}.{}", index, INTERMEDIATE_EXTENSION))
}

/// Build the FFmpeg command that cuts `window` out of `source`.
pub fn build_extract_command(
    source: &Path,
    window: &SampleWindow,
    output: &Path,
    options: &ExtractOptions,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(source, output)
        .seek(window.start)
        .duration(window.length)
        .map("0:v:0");

    if options.include_audio {
        cmd = cmd.map("0:a:0?");
    }

    if let Some(scale) = &options.scale {
        cmd = cmd.video_filter(format!("scale={}", scale));
    }

    cmd = cmd.output_args(options.encoding.video_args());

    cmd = if options.include_audio {
        cmd.output_args(options.encoding.audio_args())
    } else {
        cmd.no_audio()
    };

    cmd = cmd
        .output_arg("-avoid_negative_ts")
        .output_arg("make_zero")
        .output_format(INTERMEDIATE_CONTAINER);

    if let Some(level) = &options.log_level {
        cmd = cmd.log_level(level);
    }

    cmd
}

/// Extract one sample into `work_dir`.
///
/// Every failure is reported as [`MediaError::ExtractionFailed`] carrying the
/// window index; a partially written file is removed.
pub async fn extract_sample(
    source: &Path,
    window: &SampleWindow,
    work_dir: &Path,
    options: &ExtractOptions,
) -> MediaResult<IntermediateClip> {
    let output = intermediate_path(work_dir, window.index);
    debug!(
        index = window.index,
        start = window.start,
        length = window.length,
        output = %output.display(),
        "Extracting sample"
    );

    let cmd = build_extract_command(source, window, &output, options);
    let mut runner = FfmpegRunner::new();
    if let Some(secs) = options.timeout_secs {
        runner = runner.with_timeout(secs);
    }

    let result = match runner.run(&cmd).await {
        Ok(()) => verify_output(&output, window.index).await,
        Err(e) => Err(describe_failure(window.index, &e)),
    };

    match result {
        Ok(size) => {
            info!(index = window.index, bytes = size, "Sample extracted: {}", window);
            Ok(IntermediateClip::new(*window, output))
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&output).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial sample {}: {}",
                        output.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

/// The sample file must exist and hold data.
async fn verify_output(output: &Path, index: u32) -> MediaResult<u64> {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        Ok(_) => Err(MediaError::extraction_failed(index, "FFmpeg produced an empty file")),
        Err(_) => Err(MediaError::extraction_failed(index, "FFmpeg produced no output file")),
    }
}

fn describe_failure(index: u32, error: &MediaError) -> MediaError {
    let message = match error.stderr_summary() {
        Some(line) => format!("{}: {}", error, line),
        None => error.to_string(),
    };
    MediaError::extraction_failed(index, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> SampleWindow {
        SampleWindow::new(2, 50.0, 2.0)
    }

    #[test]
    fn test_intermediate_path_is_index_tagged() {
        let path = intermediate_path(Path::new("/work"), 7);
        assert_eq!(path, PathBuf::from("/work/sample_0007.ts"));
    }

    #[test]
    fn test_extract_command_without_audio() {
        let args = build_extract_command(
            Path::new("in.mp4"),
            &window(),
            Path::new("out.ts"),
            &ExtractOptions::default(),
        )
        .build_args();

        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        assert!(ss_pos < input_pos);
        assert_eq!(args[ss_pos + 1], "50.000000");
        assert!(args.contains(&"2.000000".to_string()));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"0:a:0?".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"mpegts".to_string()));
    }

    #[test]
    fn test_extract_command_with_audio_and_scale() {
        let options = ExtractOptions {
            scale: Some("480:-2".to_string()),
            include_audio: true,
            log_level: Some("info".to_string()),
            ..Default::default()
        };
        let args =
            build_extract_command(Path::new("in.mp4"), &window(), Path::new("out.ts"), &options)
                .build_args();

        assert!(args.contains(&"0:a:0?".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(!args.contains(&"-an".to_string()));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=480:-2");
    }

    #[tokio::test]
    async fn test_verify_output_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample_0000.ts");
        tokio::fs::write(&path, b"").await.unwrap();
        assert!(matches!(
            verify_output(&path, 0).await,
            Err(MediaError::ExtractionFailed { index: 0, .. })
        ));

        tokio::fs::write(&path, b"data").await.unwrap();
        assert_eq!(verify_output(&path, 0).await.unwrap(), 4);
    }

    #[test]
    fn test_describe_failure_keeps_index_and_stderr() {
        let err = MediaError::ffmpeg_failed("exit", Some("moov atom not found".into()), Some(1));
        match describe_failure(3, &err) {
            MediaError::ExtractionFailed { index, message } => {
                assert_eq!(index, 3);
                assert!(message.contains("moov atom not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
