//! Validated audio/video sync offset.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::SyncDirection;

/// Most negative accepted offset (audio 2 s ahead of video).
pub const MIN_OFFSET_MS: i32 = -2000;

/// Most positive accepted offset (audio 2 s behind video).
pub const MAX_OFFSET_MS: i32 = 2000;

/// Error for offsets outside the supported domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OffsetError {
    #[error("Offset {value} ms is outside [{min}, {max}] ms")]
    OutOfRange { value: i64, min: i32, max: i32 },
}

/// Signed offset between the audio and video tracks, in milliseconds.
///
/// Positive values mean the audio is delayed relative to the video,
/// negative values mean the audio runs ahead. Values are immutable; a
/// new offset is built whenever the user moves the slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SyncOffset {
    offset_ms: i32,
}

impl SyncOffset {
    /// Zero offset (no correction).
    pub const ZERO: SyncOffset = SyncOffset { offset_ms: 0 };

    /// Validate and build an offset.
    pub fn new(offset_ms: i64) -> Result<Self, OffsetError> {
        if offset_ms < MIN_OFFSET_MS as i64 || offset_ms > MAX_OFFSET_MS as i64 {
            return Err(OffsetError::OutOfRange {
                value: offset_ms,
                min: MIN_OFFSET_MS,
                max: MAX_OFFSET_MS,
            });
        }
        Ok(Self {
            offset_ms: offset_ms as i32,
        })
    }

    /// Raw signed offset in milliseconds.
    pub fn offset_ms(&self) -> i32 {
        self.offset_ms
    }

    /// Direction of the drift. Zero counts as audio delayed.
    pub fn direction(&self) -> SyncDirection {
        if self.offset_ms >= 0 {
            SyncDirection::AudioDelayed
        } else {
            SyncDirection::AudioAhead
        }
    }

    /// Absolute offset in seconds.
    pub fn magnitude_seconds(&self) -> f64 {
        self.offset_ms.unsigned_abs() as f64 / 1000.0
    }

    /// Absolute offset as a duration.
    pub fn magnitude(&self) -> Duration {
        Duration::from_millis(self.offset_ms.unsigned_abs() as u64)
    }

    pub fn is_zero(&self) -> bool {
        self.offset_ms == 0
    }
}

impl TryFrom<i64> for SyncOffset {
    type Error = OffsetError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SyncOffset> for i64 {
    fn from(offset: SyncOffset) -> Self {
        offset.offset_ms as i64
    }
}

impl std::fmt::Display for SyncOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+} ms", self.offset_ms)
    }
}
