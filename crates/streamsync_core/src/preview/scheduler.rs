//! Preview scheduler state machine.
//!
//! ```text
//! Idle ──start──▶ Armed ──leading play + timer──▶ Playing ──stop──▶ Stopped
//!                   ▲                                │                 │
//!                   └──────────── start (implicit stop) ◀──────────────┘
//! ```
//!
//! Every start bumps a generation counter. A timer that fires for an older
//! generation, or after the preview stopped, does nothing.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::sink::{PlayableSink, PlaybackError};
use super::timer::{Timer, TimerHandle};
use crate::models::{PreviewState, SyncOffset, TrackKind};

/// State shared between the scheduler and its pending timer task.
struct PreviewSession {
    video: Arc<dyn PlayableSink>,
    audio: Arc<dyn PlayableSink>,
    pending: Option<TimerHandle>,
    state: PreviewState,
    offset: Option<SyncOffset>,
    generation: u64,
    errors: Vec<PlaybackError>,
}

impl PreviewSession {
    fn sink(&self, track: TrackKind) -> &Arc<dyn PlayableSink> {
        match track {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.cancel();
        }
    }

    fn pause_both(&self) {
        self.video.pause();
        self.audio.pause();
    }

    /// Start one track, recording (not propagating) a failure.
    fn start_track(&mut self, track: TrackKind) {
        let sink = Arc::clone(self.sink(track));
        if !sink.is_ready() {
            tracing::debug!("Starting {} before its source reported ready", track);
        }
        match sink.play() {
            Ok(()) => tracing::trace!("Preview started {} track", track),
            Err(e) => {
                let err = PlaybackError::new(track, e);
                tracing::warn!("Preview: {}", err);
                self.errors.push(err);
            }
        }
    }

    /// Cancel the timer, pause both sinks and close the preview window.
    fn halt(&mut self) {
        self.cancel_pending();
        self.pause_both();
        self.generation += 1;
        self.state = PreviewState::Stopped;
    }
}

/// Plays two sinks with a controlled relative delay.
///
/// The leading track starts immediately, the lagging one after
/// `|offset|` milliseconds through a single cancellable timer. Dropping
/// the scheduler stops any running preview.
pub struct PreviewScheduler {
    session: Arc<Mutex<PreviewSession>>,
    timer: Arc<dyn Timer>,
}

impl PreviewScheduler {
    /// Create a scheduler over the caller's video and audio sinks.
    pub fn new(
        video: Arc<dyn PlayableSink>,
        audio: Arc<dyn PlayableSink>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(PreviewSession {
                video,
                audio,
                pending: None,
                state: PreviewState::Idle,
                offset: None,
                generation: 0,
                errors: Vec::new(),
            })),
            timer,
        }
    }

    /// Start (or restart) a preview with the given offset.
    ///
    /// Any running preview is stopped first, both sinks are paused and
    /// rewound, then the leading track plays and the lagging track is
    /// scheduled.
    pub fn start_preview(&self, offset: SyncOffset) {
        let direction = offset.direction();
        let leading = direction.leading_track();
        let lagging = direction.lagging_track();

        let generation = {
            let mut session = self.session.lock();

            if session.state == PreviewState::Playing {
                tracing::debug!("Preview restarted while playing; stopping previous run");
                session.halt();
            }

            // Idempotent reset
            session.cancel_pending();
            session.pause_both();
            session.video.seek(Duration::ZERO);
            session.audio.seek(Duration::ZERO);
            session.generation += 1;
            session.offset = Some(offset);
            session.state = PreviewState::Armed;

            tracing::info!(
                "Preview {}: {} leads, {} follows after {} ms",
                offset,
                leading,
                lagging,
                offset.magnitude().as_millis()
            );

            session.start_track(leading);
            session.state = PreviewState::Playing;
            session.generation
        };

        // Not under the lock: a timer may run the task before returning.
        let weak = Arc::downgrade(&self.session);
        let handle = self.timer.schedule(
            offset.magnitude(),
            Box::new(move || start_lagging(weak, generation, lagging)),
        );

        let mut session = self.session.lock();
        if session.generation == generation && handle.is_pending() {
            session.pending = Some(handle);
        } else {
            handle.cancel();
        }
    }

    /// Stop the preview: cancel the pending start and pause both sinks.
    ///
    /// Safe to call repeatedly or before any preview was started.
    pub fn stop_preview(&self) {
        let mut session = self.session.lock();
        let was_playing = session.state == PreviewState::Playing;
        session.halt();
        if was_playing {
            tracing::info!("Preview stopped");
        }
    }

    /// Current state of the preview.
    pub fn state(&self) -> PreviewState {
        self.session.lock().state
    }

    /// Offset of the most recent preview, if one was started.
    pub fn offset(&self) -> Option<SyncOffset> {
        self.session.lock().offset
    }

    /// Whether the lagging track is still waiting to start.
    pub fn has_pending_start(&self) -> bool {
        self.session
            .lock()
            .pending
            .as_ref()
            .is_some_and(|t| t.is_pending())
    }

    /// Playback failures recorded so far.
    pub fn playback_errors(&self) -> Vec<PlaybackError> {
        self.session.lock().errors.clone()
    }

    /// Drain recorded playback failures.
    pub fn take_playback_errors(&self) -> Vec<PlaybackError> {
        std::mem::take(&mut self.session.lock().errors)
    }

    /// Stop any preview and hand the sinks back to the caller.
    pub fn release(self) -> (Arc<dyn PlayableSink>, Arc<dyn PlayableSink>) {
        self.stop_preview();
        let session = self.session.lock();
        (Arc::clone(&session.video), Arc::clone(&session.audio))
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        self.stop_preview();
    }
}

/// Timer task: start the lagging track if its preview is still current.
fn start_lagging(session: Weak<Mutex<PreviewSession>>, generation: u64, track: TrackKind) {
    let Some(session) = session.upgrade() else {
        return;
    };
    let mut session = session.lock();
    if session.generation != generation || session.state != PreviewState::Playing {
        tracing::trace!("Ignoring stale preview timer for {} track", track);
        return;
    }
    session.pending = None;
    session.start_track(track);
}
