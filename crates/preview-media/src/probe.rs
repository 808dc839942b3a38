//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::{check_ffprobe, wait_with_timeout};
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    disposition: Option<FfprobeDisposition>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

/// Probe a video file for information.
///
/// Any problem with the file itself (empty, corrupt, no video stream,
/// unknown duration) is reported as [`MediaError::UnreadableMedia`]. FFprobe
/// is killed after `timeout_secs` when one is given.
pub async fn probe_video(
    path: impl AsRef<Path>,
    timeout_secs: Option<u64>,
) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;
    if metadata.len() == 0 {
        return Err(MediaError::unreadable(format!(
            "{} is empty",
            path.display()
        )));
    }

    let ffprobe = check_ffprobe()?;

    let child = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    let output = wait_with_timeout(child, timeout_secs, "FFprobe").await?;

    if !output.status.success() {
        return Err(unreadable_from_stderr(&output.stderr));
    }

    let info = parse_probe_output(&output.stdout)?;
    debug!(
        path = %path.display(),
        duration = info.duration,
        codec = %info.codec,
        width = info.width,
        height = info.height,
        "Probed video"
    );
    Ok(info)
}

/// Probe only the duration in seconds.
pub async fn probe_duration(path: impl AsRef<Path>, timeout_secs: Option<u64>) -> MediaResult<f64> {
    let info = probe_video(path, timeout_secs).await?;
    Ok(info.duration)
}

/// A failed FFprobe run means the input is not media it can read. The last
/// stderr line carries the demuxer's reason.
fn unreadable_from_stderr(stderr: &[u8]) -> MediaError {
    let stderr = String::from_utf8_lossy(stderr);
    let reason = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("FFprobe failed");
    MediaError::unreadable(reason.to_string())
}

/// Interpret FFprobe JSON output.
///
/// A reported duration of exactly zero is passed through so the caller can
/// treat it as an empty source; missing, negative or unparsable durations
/// are unreadable media.
pub(crate) fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::unreadable(format!("unparsable FFprobe output: {}", e)))?;

    // Cover art is reported as a video stream; skip it.
    let video_stream = probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find(|s| s.disposition.as_ref().map_or(0, |d| d.attached_pic) == 0)
        .ok_or_else(|| MediaError::unreadable("no video stream found"))?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| parse_seconds(video_stream.duration.as_deref()))
        .ok_or_else(|| MediaError::unreadable("duration could not be determined"))?;

    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        has_audio,
    })
}

/// Parse a duration field; "N/A", negative and non-finite values are rejected.
fn parse_seconds(value: Option<&str>) -> Option<f64> {
    let secs = value?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_OK: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "duration": "99.9"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "100.000000", "size": "1048576"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output(PROBE_OK.as_bytes()).unwrap();
        assert!((info.duration - 100.0).abs() < 1e-9);
        assert_eq!(info.width, 1920);
        assert_eq!(info.codec, "h264");
        assert!(info.has_audio);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_falls_back_to_stream_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9", "duration": "12.5"}],
            "format": {"duration": "N/A"}
        }"#;
        let info = parse_probe_output(json.as_bytes()).unwrap();
        assert!((info.duration - 12.5).abs() < 1e-9);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_audio_only_is_unreadable() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "codec_name": "mp3"}],
            "format": {"duration": "180.0"}
        }"#;
        assert!(matches!(
            parse_probe_output(json.as_bytes()),
            Err(MediaError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_cover_art_is_not_a_video_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "mp3"},
                {"codec_type": "video", "codec_name": "mjpeg", "disposition": {"attached_pic": 1}}
            ],
            "format": {"duration": "180.0"}
        }"#;
        assert!(matches!(
            parse_probe_output(json.as_bytes()),
            Err(MediaError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_missing_duration_is_unreadable() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(json.as_bytes()),
            Err(MediaError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_garbage_output_is_unreadable() {
        assert!(matches!(
            parse_probe_output(b"\x00\x01garbage"),
            Err(MediaError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_zero_duration_passes_through() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "0.000000"}}"#;
        let info = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(info.duration, 0.0);
    }

    #[tokio::test]
    async fn test_zero_byte_file_is_unreadable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = probe_video(file.path(), Some(10)).await;
        assert!(matches!(result, Err(MediaError::UnreadableMedia(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = probe_video(dir.path().join("missing.mp4"), None).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }

    #[test]
    fn test_failed_run_reports_last_stderr_line() {
        let stderr = b"[mov,mp4,m4a,3gp,3g2,mj2 @ 0x55d0] moov atom not found\n\
            /tmp/work/source.mp4: Invalid data found when processing input\n\n";
        match unreadable_from_stderr(stderr) {
            MediaError::UnreadableMedia(reason) => {
                assert_eq!(reason, "/tmp/work/source.mp4: Invalid data found when processing input");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failed_run_without_stderr() {
        match unreadable_from_stderr(b"  \n") {
            MediaError::UnreadableMedia(reason) => assert_eq!(reason, "FFprobe failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_corrupt_header_is_unreadable() {
        if check_ffprobe().is_err() {
            return;
        }
        let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"\x00\x00\x00\x18ftypisomXXXX not a real movie").unwrap();

        let result = probe_video(file.path(), Some(30)).await;
        assert!(matches!(result, Err(MediaError::UnreadableMedia(_))), "{result:?}");
    }
}
