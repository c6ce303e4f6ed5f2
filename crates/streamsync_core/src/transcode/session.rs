//! One correction run through a transcoding engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineSettings;
use crate::logging::SessionLogger;
use crate::models::{RemuxPlan, TranscodeStatus};
use crate::planner::{format_args_pretty, FfmpegArgsBuilder};

use super::artifact::OutputArtifact;
use super::engine::TranscodeEngine;
use super::errors::{EngineFailure, TranscodeError, TranscodeResult};

/// Callback receiving session progress in `[0, 1]`.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Handle for cancelling a running session.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the session.
    ///
    /// The session will stop at the next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Keeps reported progress in range and non-decreasing.
#[derive(Debug, Default)]
struct ProgressGate {
    last: f64,
}

impl ProgressGate {
    fn accept(&mut self, raw: f64) -> f64 {
        if raw.is_nan() {
            return self.last;
        }
        let clamped = raw.clamp(0.0, 1.0);
        if clamped > self.last {
            self.last = clamped;
        }
        self.last
    }
}

/// A single attempt at applying a [`RemuxPlan`].
///
/// Steps run strictly in order: Loading, Writing, Executing, Reading,
/// then Done. Any failure moves the session to Failed; there is no retry.
/// A session runs at most once.
pub struct TranscodeSession {
    plan: RemuxPlan,
    settings: EngineSettings,
    logger: Arc<SessionLogger>,
    status: TranscodeStatus,
    gate: ProgressGate,
    progress_callback: Option<ProgressCallback>,
    show_args_pretty: bool,
    cancel: CancelHandle,
}

impl TranscodeSession {
    pub fn new(plan: RemuxPlan, settings: EngineSettings, logger: Arc<SessionLogger>) -> Self {
        Self {
            plan,
            settings,
            logger,
            status: TranscodeStatus::NotStarted,
            gate: ProgressGate::default(),
            progress_callback: None,
            show_args_pretty: false,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Log engine arguments one option per line before executing.
    pub fn with_args_pretty(mut self, enabled: bool) -> Self {
        self.show_args_pretty = enabled;
        self
    }

    pub fn status(&self) -> TranscodeStatus {
        self.status
    }

    /// Last progress value reported by the engine, in `[0, 1]`.
    ///
    /// Completion is signalled by [`TranscodeStatus::Done`], not by this
    /// value reaching 1.0.
    pub fn progress(&self) -> f64 {
        self.gate.last
    }

    pub fn plan(&self) -> &RemuxPlan {
        &self.plan
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run the plan against `engine` with `input` as the source file.
    ///
    /// Returns [`TranscodeError::SessionSpent`] without touching the engine
    /// if this session has already run.
    pub async fn run<E: TranscodeEngine>(
        &mut self,
        engine: &mut E,
        input: &[u8],
    ) -> TranscodeResult<OutputArtifact> {
        if self.status != TranscodeStatus::NotStarted {
            return Err(TranscodeError::SessionSpent);
        }

        tracing::info!(
            session = self.logger.name(),
            operation = ?self.plan.operation,
            shift_seconds = self.plan.shift_seconds(),
            "Starting transcode session"
        );

        match self.run_steps(engine, input).await {
            Ok(artifact) => {
                self.status = TranscodeStatus::Done;
                self.logger.success(&format!(
                    "Wrote {} ({} bytes)",
                    artifact.file_name,
                    artifact.len()
                ));
                Ok(artifact)
            }
            Err(e) => {
                self.status = TranscodeStatus::Failed;
                self.logger.error(&e.to_string());
                tracing::warn!(session = self.logger.name(), error = %e, "Transcode session failed");
                Err(e)
            }
        }
    }

    async fn run_steps<E: TranscodeEngine>(
        &mut self,
        engine: &mut E,
        input: &[u8],
    ) -> TranscodeResult<OutputArtifact> {
        self.enter(TranscodeStatus::Loading)?;
        if !engine.is_loaded() {
            engine.load().await.map_err(TranscodeError::engine_load)?;
        }

        let outcome = self.stage_and_process(engine, input).await;
        self.release_staged(engine).await;
        outcome
    }

    async fn stage_and_process<E: TranscodeEngine>(
        &mut self,
        engine: &mut E,
        input: &[u8],
    ) -> TranscodeResult<OutputArtifact> {
        self.enter(TranscodeStatus::Writing)?;
        let input_name = self.settings.input_name.clone();
        engine
            .stage(&input_name, input)
            .await
            .map_err(|e| TranscodeError::staging(input_name.as_str(), e))?;

        self.enter(TranscodeStatus::Executing)?;
        self.execute(engine).await?;

        self.enter(TranscodeStatus::Reading)?;
        let output_name = self.settings.output_name.clone();
        let bytes = engine
            .retrieve(&output_name)
            .await
            .map_err(|e| TranscodeError::retrieval(output_name.as_str(), e))?;

        Ok(OutputArtifact::new(
            bytes,
            self.settings.artifact_name.clone(),
            self.settings.artifact_mime.clone(),
        ))
    }

    async fn execute<E: TranscodeEngine>(&mut self, engine: &mut E) -> TranscodeResult<()> {
        let args = FfmpegArgsBuilder::new(
            &self.plan,
            &self.settings.input_name,
            &self.settings.output_name,
        )
        .build();

        self.logger
            .command(&format!("{} {}", engine.name(), args.join(" ")));
        if self.show_args_pretty {
            self.logger.log_args_pretty(&format_args_pretty(&args));
        }

        let gate = &mut self.gate;
        let callback = &self.progress_callback;
        let logger = &self.logger;
        let mut report = move |raw: f64| {
            let value = gate.accept(raw);
            logger.progress((value * 100.0).round() as u32);
            if let Some(cb) = callback {
                cb(value);
            }
        };

        let result = engine.execute(&args, &mut report).await;

        for line in engine.take_output() {
            self.logger.output_line(&line);
        }

        if let Err(e) = result {
            self.logger.show_tail(engine.name());
            return Err(TranscodeError::execution(e));
        }
        Ok(())
    }

    /// Best-effort removal of the staged input and the engine output.
    async fn release_staged<E: TranscodeEngine>(&mut self, engine: &mut E) {
        let names = [
            self.settings.input_name.clone(),
            self.settings.output_name.clone(),
        ];
        for name in names {
            match engine.remove(&name).await {
                Ok(()) => self.logger.debug(&format!("Removed {} from engine", name)),
                Err(EngineFailure::FileNotFound(_)) => {}
                Err(e) => self
                    .logger
                    .warn(&format!("Failed to remove {} from engine: {}", name, e)),
            }
        }
    }

    /// Move to `next`, unless cancellation was requested.
    fn enter(&mut self, next: TranscodeStatus) -> TranscodeResult<()> {
        if self.cancel.is_cancelled() {
            self.logger.warn(&format!("Session cancelled before {}", next));
            return Err(TranscodeError::cancelled(next));
        }
        self.status = next;
        self.logger.phase(&next.to_string());
        Ok(())
    }
}
