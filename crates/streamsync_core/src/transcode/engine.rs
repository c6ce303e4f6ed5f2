//! Transcoding engine trait.

use std::future::Future;

use super::errors::EngineFailure;

/// Progress sink handed to [`TranscodeEngine::execute`].
///
/// Receives the engine's raw fractional progress; values are not
/// guaranteed to be in range or monotonic.
pub type EngineProgress<'a> = &'a mut (dyn FnMut(f64) + Send);

/// A stateful media transcoding engine.
///
/// The engine keeps named files in a private working area and runs
/// ffmpeg-style argument lists against them. It is an exclusive resource:
/// every mutating operation takes `&mut self`, so two sessions can never
/// drive the same engine at once.
pub trait TranscodeEngine: Send {
    /// Short name used in logs (e.g. "ffmpeg").
    fn name(&self) -> &str;

    fn is_loaded(&self) -> bool;

    /// Prepare the engine for use. Idempotent.
    fn load(&mut self) -> impl Future<Output = Result<(), EngineFailure>> + Send;

    /// Place `bytes` in the working area under `name`.
    fn stage(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), EngineFailure>> + Send;

    /// Run the engine with `args`, reporting raw progress as it goes.
    fn execute(
        &mut self,
        args: &[String],
        progress: EngineProgress<'_>,
    ) -> impl Future<Output = Result<(), EngineFailure>> + Send;

    /// Read a file back out of the working area.
    fn retrieve(&mut self, name: &str) -> impl Future<Output = Result<Vec<u8>, EngineFailure>> + Send;

    /// Delete a file from the working area.
    fn remove(&mut self, name: &str) -> impl Future<Output = Result<(), EngineFailure>> + Send;

    /// Drain diagnostic output lines collected since the last call.
    fn take_output(&mut self) -> Vec<String> {
        Vec::new()
    }
}
