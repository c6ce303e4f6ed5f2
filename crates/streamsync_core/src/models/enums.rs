//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Kind of media track handled by the correction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Stream specifier letter used in ffmpeg `-map` arguments.
    pub fn stream_letter(&self) -> char {
        match self {
            TrackKind::Video => 'v',
            TrackKind::Audio => 'a',
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Which way the audio diverges from the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Audio is heard after the matching picture (offset >= 0).
    AudioDelayed,
    /// Audio is heard before the matching picture (offset < 0).
    AudioAhead,
}

impl SyncDirection {
    /// Track that starts first when previewing in this direction.
    pub fn leading_track(&self) -> TrackKind {
        match self {
            SyncDirection::AudioDelayed => TrackKind::Video,
            SyncDirection::AudioAhead => TrackKind::Audio,
        }
    }

    /// Track whose start is delayed when previewing in this direction.
    pub fn lagging_track(&self) -> TrackKind {
        match self {
            SyncDirection::AudioDelayed => TrackKind::Audio,
            SyncDirection::AudioAhead => TrackKind::Video,
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncDirection::AudioDelayed => write!(f, "audio delayed"),
            SyncDirection::AudioAhead => write!(f, "audio ahead"),
        }
    }
}

/// Remux operation selected by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemuxOperation {
    /// Shift the audio later on the output timeline.
    DelayAudio,
    /// Drop the leading edge of the audio so it starts later in the source.
    TrimAudioLeadingEdge,
}

impl std::fmt::Display for RemuxOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemuxOperation::DelayAudio => write!(f, "Delay Audio"),
            RemuxOperation::TrimAudioLeadingEdge => write!(f, "Trim Audio Leading Edge"),
        }
    }
}

/// How a track is carried into the output container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecMode {
    /// Encoded stream copied unchanged.
    Passthrough,
    /// Stream decoded and encoded again with the named codec.
    Reencode(String),
}

impl CodecMode {
    /// Codec argument value for ffmpeg (`copy` or the encoder name).
    pub fn ffmpeg_value(&self) -> &str {
        match self {
            CodecMode::Passthrough => "copy",
            CodecMode::Reencode(codec) => codec,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, CodecMode::Passthrough)
    }
}

/// State of the synchronized preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreviewState {
    /// No preview has been started yet.
    #[default]
    Idle,
    /// Sinks were reset and the leading track is about to start.
    Armed,
    /// Leading track started, lagging track started or scheduled.
    Playing,
    /// Preview stopped; both sinks paused.
    Stopped,
}

/// Lifecycle of a single transcode attempt.
///
/// Transitions are strictly linear; any step may jump to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranscodeStatus {
    #[default]
    NotStarted,
    Loading,
    Writing,
    Executing,
    Reading,
    Done,
    Failed,
}

impl TranscodeStatus {
    /// Whether the session has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscodeStatus::Done | TranscodeStatus::Failed)
    }
}

impl std::fmt::Display for TranscodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TranscodeStatus::NotStarted => "Not Started",
            TranscodeStatus::Loading => "Loading",
            TranscodeStatus::Writing => "Writing",
            TranscodeStatus::Executing => "Executing",
            TranscodeStatus::Reading => "Reading",
            TranscodeStatus::Done => "Done",
            TranscodeStatus::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
