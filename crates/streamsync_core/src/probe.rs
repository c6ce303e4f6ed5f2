//! Track probing using ffprobe.
//!
//! Determines which tracks an input carries (so the planner can fail fast)
//! and its duration (so engine progress can be expressed as a fraction).

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::models::TrackDescriptor;

/// Errors that can occur while probing a file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to run {tool}: {message}")]
    SpawnFailed { tool: String, message: String },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// What ffprobe reported about an input.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    pub tracks: TrackDescriptor,
    /// Container duration in seconds, when known.
    pub duration_seconds: Option<f64>,
    /// Container format name (e.g. "mov,mp4,m4a,3gp,3g2,mj2").
    pub format_name: Option<String>,
}

/// Probe `path` with the `ffprobe` found on PATH and return its tracks.
pub async fn probe_tracks(path: &Path) -> ProbeResult<TrackDescriptor> {
    Ok(probe_media(Path::new("ffprobe"), path).await?.tracks)
}

/// Probe `path` with the given ffprobe executable.
pub async fn probe_media(ffprobe: &Path, path: &Path) -> ProbeResult<MediaProbe> {
    if !path.exists() {
        return Err(ProbeError::FileNotFound(path.display().to_string()));
    }

    tracing::debug!("Probing file: {}", path.display());

    let output = Command::new(ffprobe)
        .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::SpawnFailed {
            tool: ffprobe.display().to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            tool: "ffprobe".to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse `ffprobe -show_streams -show_format -of json` output.
pub fn parse_probe_output(stdout: &[u8]) -> ProbeResult<MediaProbe> {
    let json: Value = serde_json::from_slice(stdout)?;

    let mut has_video = false;
    let mut has_audio = false;
    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            // Cover art shows up as a video stream with attached_pic set
            let attached_pic = stream
                .get("disposition")
                .and_then(|d| d.get("attached_pic"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
                == 1;

            match stream.get("codec_type").and_then(|v| v.as_str()) {
                Some("video") if !attached_pic => has_video = true,
                Some("audio") => has_audio = true,
                _ => {}
            }
        }
    }

    let format = json.get("format");
    let duration_seconds = format
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);
    let format_name = format
        .and_then(|f| f.get("format_name"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());

    Ok(MediaProbe {
        tracks: TrackDescriptor::new(has_video, has_audio),
        duration_seconds,
        format_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP4_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "disposition": {"attached_pic": 0}},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "12.480000"}
    }"#;

    #[test]
    fn parses_audio_video_file() {
        let probe = parse_probe_output(MP4_JSON.as_bytes()).unwrap();
        assert!(probe.tracks.is_complete());
        assert_eq!(probe.duration_seconds, Some(12.48));
        assert_eq!(
            probe.format_name.as_deref(),
            Some("mov,mp4,m4a,3gp,3g2,mj2")
        );
    }

    #[test]
    fn cover_art_is_not_a_video_track() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "disposition": {"attached_pic": 1}}
            ],
            "format": {"duration": "N/A"}
        }"#;
        let probe = parse_probe_output(json.as_bytes()).unwrap();
        assert!(probe.tracks.has_audio_track);
        assert!(!probe.tracks.has_video_track);
        assert_eq!(probe.duration_seconds, None);
    }

    #[test]
    fn empty_output_has_no_tracks() {
        let probe = parse_probe_output(b"{}").unwrap();
        assert!(!probe.tracks.is_complete());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = probe_tracks(Path::new("/nonexistent/input.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::FileNotFound(_)));
    }
}
