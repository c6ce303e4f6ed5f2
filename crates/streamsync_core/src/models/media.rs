//! Media-related data structures (track presence, upload candidates).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which tracks the input media carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub has_video_track: bool,
    pub has_audio_track: bool,
}

impl TrackDescriptor {
    pub fn new(has_video_track: bool, has_audio_track: bool) -> Self {
        Self {
            has_video_track,
            has_audio_track,
        }
    }

    /// Descriptor for a file with one video and one audio track.
    pub fn audio_video() -> Self {
        Self::new(true, true)
    }

    /// Whether both tracks needed for an offset remux are present.
    pub fn is_complete(&self) -> bool {
        self.has_video_track && self.has_audio_track
    }
}

/// Container formats accepted for upload and correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaContainer {
    Mp4,
    WebM,
    QuickTime,
    Matroska,
}

impl MediaContainer {
    /// Look up a container by MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "video/mp4" => Some(Self::Mp4),
            "video/webm" => Some(Self::WebM),
            "video/quicktime" => Some(Self::QuickTime),
            "video/x-matroska" => Some(Self::Matroska),
            _ => None,
        }
    }

    /// Look up a container by file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Some(Self::Mp4),
            "webm" => Some(Self::WebM),
            "mov" => Some(Self::QuickTime),
            "mkv" => Some(Self::Matroska),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::WebM => "video/webm",
            Self::QuickTime => "video/quicktime",
            Self::Matroska => "video/x-matroska",
        }
    }
}

impl std::fmt::Display for MediaContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp4 => write!(f, "MP4"),
            Self::WebM => write!(f, "WebM"),
            Self::QuickTime => write!(f, "MOV"),
            Self::Matroska => write!(f, "MKV"),
        }
    }
}

/// A file the user picked, before it is accepted for preview or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCandidate {
    pub file_name: String,
    /// MIME type reported by the picker; may be empty.
    #[serde(default)]
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadCandidate {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

/// Rejections for upload candidates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unsupported file type '{0}'. Use MP4, WebM, MOV or MKV.")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes). Maximum is {max} bytes.")]
    TooLarge { size: u64, max: u64 },
}

/// Check that a candidate is a supported container within the size limit.
///
/// The MIME type wins when present; otherwise the extension decides.
/// Type is checked before size.
pub fn validate_upload(
    candidate: &UploadCandidate,
    max_size_bytes: u64,
) -> Result<MediaContainer, InputError> {
    let container = if candidate.mime_type.trim().is_empty() {
        Path::new(&candidate.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(MediaContainer::from_extension)
    } else {
        MediaContainer::from_mime(&candidate.mime_type)
    };

    let container = container.ok_or_else(|| {
        let shown = if candidate.mime_type.trim().is_empty() {
            candidate.file_name.clone()
        } else {
            candidate.mime_type.clone()
        };
        InputError::UnsupportedType(shown)
    })?;

    if candidate.size_bytes > max_size_bytes {
        return Err(InputError::TooLarge {
            size: candidate.size_bytes,
            max: max_size_bytes,
        });
    }

    Ok(container)
}
