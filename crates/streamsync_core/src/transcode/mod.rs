//! Applying a remux plan through a transcoding engine.
//!
//! A [`TranscodeSession`] runs one plan once: load the engine, stage the
//! input, execute, read the output back. Progress is clamped to `[0, 1]`
//! and never moves backwards.

mod artifact;
mod engine;
mod errors;
mod process_engine;
mod session;

pub use artifact::OutputArtifact;
pub use engine::{EngineProgress, TranscodeEngine};
pub use errors::{EngineFailure, TranscodeError, TranscodeResult};
pub use process_engine::ProcessEngine;
pub use session::{CancelHandle, ProgressCallback, TranscodeSession};
