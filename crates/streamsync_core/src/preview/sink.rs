//! Playable media sink interface.

use std::time::Duration;

use thiserror::Error;

use crate::models::TrackKind;

/// Failure reported by a sink when asked to play.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink has not buffered enough of its source yet.
    #[error("source not ready")]
    NotReady,

    /// The sink refused to play for another reason.
    #[error("play rejected: {0}")]
    Rejected(String),
}

/// A sink failed to play during a preview.
///
/// Non-fatal: the scheduler keeps the other track running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{track} playback failed: {source}")]
pub struct PlaybackError {
    pub track: TrackKind,
    #[source]
    pub source: SinkError,
}

impl PlaybackError {
    pub fn new(track: TrackKind, source: SinkError) -> Self {
        Self { track, source }
    }
}

/// An addressable media handle that can be played, paused and seeked.
///
/// Handles are shared with the caller's UI layer, so all methods take
/// `&self`; implementations use interior mutability. Methods are called
/// while the scheduler holds its state lock and must not call back into
/// the scheduler.
pub trait PlayableSink: Send + Sync {
    /// Start or resume playback.
    fn play(&self) -> Result<(), SinkError>;

    /// Pause playback. Pausing a paused sink is a no-op.
    fn pause(&self);

    /// Move the playhead.
    fn seek(&self, position: Duration);

    /// Whether the source has signalled it is ready to play.
    fn is_ready(&self) -> bool {
        true
    }
}
