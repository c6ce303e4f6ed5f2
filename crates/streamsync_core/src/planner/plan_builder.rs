//! Remux plan builder.
//!
//! Both branches read the same input twice. The instance carrying the
//! audio gets the time shift; the video is always copied untouched.
//!
//! ```text
//! offset >= 0  DelayAudio            #0 video (as is)   #1 audio (delayed)
//! offset <  0  TrimAudioLeadingEdge  #0 audio (seeked)  #1 video (as is)
//! ```

use thiserror::Error;

use crate::models::{
    CodecMode, InputInstance, InputShift, RemuxOperation, RemuxPlan, SyncDirection, SyncOffset,
    TrackDescriptor, TrackKind,
};

/// Audio encoder used when none is configured.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Error types for remux plan building.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Input lacks a track needed for the remux.
    #[error("Input is missing required tracks (video: {has_video}, audio: {has_audio})")]
    InvalidTrack { has_video: bool, has_audio: bool },
}

/// Build the remux plan for an offset, re-encoding audio with `aac`.
pub fn build_remux_plan(
    offset: SyncOffset,
    track: TrackDescriptor,
) -> Result<RemuxPlan, PlanError> {
    build_remux_plan_with_codec(offset, track, DEFAULT_AUDIO_CODEC)
}

/// Build the remux plan using the given audio encoder.
///
/// Zero offset takes the delay branch with a zero shift, so the plan
/// shape never changes and audio is always re-encoded.
pub fn build_remux_plan_with_codec(
    offset: SyncOffset,
    track: TrackDescriptor,
    audio_codec: &str,
) -> Result<RemuxPlan, PlanError> {
    if !track.is_complete() {
        return Err(PlanError::InvalidTrack {
            has_video: track.has_video_track,
            has_audio: track.has_audio_track,
        });
    }

    let seconds = offset.magnitude_seconds();
    let (operation, primary, secondary) = match offset.direction() {
        SyncDirection::AudioDelayed => (
            RemuxOperation::DelayAudio,
            InputInstance::new(0, TrackKind::Video, InputShift::None),
            InputInstance::new(1, TrackKind::Audio, InputShift::Delay(seconds)),
        ),
        SyncDirection::AudioAhead => (
            RemuxOperation::TrimAudioLeadingEdge,
            InputInstance::new(0, TrackKind::Audio, InputShift::Seek(seconds)),
            InputInstance::new(1, TrackKind::Video, InputShift::None),
        ),
    };

    tracing::debug!(
        "Planned {} for offset {} (shift {:.3}s)",
        operation,
        offset,
        seconds
    );

    Ok(RemuxPlan {
        operation,
        primary,
        secondary,
        video_codec: CodecMode::Passthrough,
        audio_codec: CodecMode::Reencode(audio_codec.to_string()),
    })
}
