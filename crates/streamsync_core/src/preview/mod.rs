//! Synchronized A/V preview.
//!
//! Plays a video sink and an audio sink bound to the same source with the
//! audio shifted by the chosen offset, so the user can judge a correction
//! before committing to it.
//!
//! # Architecture
//!
//! ```text
//! PreviewScheduler
//!     ├── PlayableSink (video, muted)
//!     ├── PlayableSink (audio)
//!     └── Timer ── at most one pending start of the lagging track
//! ```
//!
//! # Example
//!
//! ```ignore
//! use streamsync_core::preview::{PreviewScheduler, TokioTimer};
//!
//! let scheduler = PreviewScheduler::new(video, audio, Arc::new(TokioTimer::current()?));
//! scheduler.start_preview(SyncOffset::new(500)?);
//! // ... user listens ...
//! scheduler.stop_preview();
//! ```

mod scheduler;
mod sink;
mod timer;

pub use scheduler::PreviewScheduler;
pub use sink::{PlayableSink, PlaybackError, SinkError};
pub use timer::{ManualTimer, Timer, TimerHandle, TimerTask, TokioTimer};
