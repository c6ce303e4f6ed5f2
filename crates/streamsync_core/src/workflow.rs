//! End-to-end correction: validate, plan, transcode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;

use crate::config::Settings;
use crate::logging::{LogCallback, LogConfig, SessionLogger};
use crate::models::{validate_upload, InputError, SyncOffset, TrackDescriptor, UploadCandidate};
use crate::planner::{build_remux_plan_with_codec, PlanError};
use crate::transcode::{
    OutputArtifact, ProgressCallback, TranscodeEngine, TranscodeError, TranscodeSession,
};

/// Errors from a correction run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to create session log: {0}")]
    Log(#[source] std::io::Error),

    #[error("Failed to write corrected file: {0}")]
    Save(#[source] std::io::Error),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Everything needed to correct one file.
pub struct CorrectionRequest {
    pub offset: SyncOffset,
    pub tracks: TrackDescriptor,
    pub settings: Settings,
    pub input: Vec<u8>,
    /// Upload metadata; validated against `[upload]` limits when present.
    pub upload: Option<UploadCandidate>,
    /// Directory for the session log file. Defaults to `[paths].logs_folder`;
    /// no file is written when both are empty.
    pub log_dir: Option<PathBuf>,
    pub log_callback: Option<LogCallback>,
}

impl CorrectionRequest {
    pub fn new(offset: SyncOffset, tracks: TrackDescriptor, settings: Settings, input: Vec<u8>) -> Self {
        Self {
            offset,
            tracks,
            settings,
            input,
            upload: None,
            log_dir: None,
            log_callback: None,
        }
    }

    pub fn with_upload(mut self, upload: UploadCandidate) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }
}

/// Validate, plan and run one correction on `engine`.
///
/// Upload and track problems are reported before the engine is touched.
pub async fn correct<E: TranscodeEngine>(
    request: CorrectionRequest,
    engine: &mut E,
    progress: Option<ProgressCallback>,
) -> Result<OutputArtifact, WorkflowError> {
    let CorrectionRequest {
        offset,
        tracks,
        settings,
        input,
        upload,
        log_dir,
        log_callback,
    } = request;

    if let Some(upload) = &upload {
        let container = validate_upload(upload, settings.upload.max_size_bytes)?;
        tracing::debug!(file = %upload.file_name, container = ?container, "Upload accepted");
    }

    let plan = build_remux_plan_with_codec(offset, tracks, &settings.engine.audio_codec)?;

    let session_name = format!("correction_{}", Local::now().format("%Y%m%d_%H%M%S"));
    let mut builder = SessionLogger::builder(session_name)
        .config(LogConfig::from_settings(&settings.logging));
    let log_dir = log_dir.or_else(|| {
        let folder = &settings.paths.logs_folder;
        (!folder.is_empty()).then(|| PathBuf::from(folder))
    });
    if let Some(dir) = log_dir {
        builder = builder.log_dir(dir);
    }
    if let Some(callback) = log_callback {
        builder = builder.callback(callback);
    }
    let logger = Arc::new(builder.build().map_err(WorkflowError::Log)?);
    logger.info(&format!("Offset {}", offset));

    let mut session = TranscodeSession::new(plan, settings.engine, Arc::clone(&logger))
        .with_args_pretty(settings.logging.show_args_pretty);
    if let Some(callback) = progress {
        session = session.with_progress_callback(callback);
    }

    let artifact = session.run(engine, &input).await?;
    logger.close();
    Ok(artifact)
}

/// Run [`correct`] and write the result into `[paths].output_folder`.
///
/// Returns the path of the written file.
pub async fn correct_and_save<E: TranscodeEngine>(
    request: CorrectionRequest,
    engine: &mut E,
    progress: Option<ProgressCallback>,
) -> Result<PathBuf, WorkflowError> {
    let output_folder = PathBuf::from(&request.settings.paths.output_folder);
    let artifact = correct(request, engine, progress).await?;
    save_artifact(&artifact, &output_folder)
}

fn save_artifact(artifact: &OutputArtifact, folder: &Path) -> Result<PathBuf, WorkflowError> {
    artifact.write_to(folder).map_err(WorkflowError::Save)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::{EngineFailure, EngineProgress};
    use parking_lot::Mutex;
    use tempfile::tempdir;

    /// Engine that copies input to output and remembers the arguments.
    #[derive(Default)]
    struct CopyEngine {
        touched: bool,
        args: Vec<String>,
        staged: Vec<u8>,
    }

    impl TranscodeEngine for CopyEngine {
        fn name(&self) -> &str {
            "copy"
        }

        fn is_loaded(&self) -> bool {
            self.touched
        }

        async fn load(&mut self) -> Result<(), EngineFailure> {
            self.touched = true;
            Ok(())
        }

        async fn stage(&mut self, _name: &str, bytes: &[u8]) -> Result<(), EngineFailure> {
            self.staged = bytes.to_vec();
            Ok(())
        }

        async fn execute(
            &mut self,
            args: &[String],
            progress: EngineProgress<'_>,
        ) -> Result<(), EngineFailure> {
            self.args = args.to_vec();
            progress(0.5);
            Ok(())
        }

        async fn retrieve(&mut self, _name: &str) -> Result<Vec<u8>, EngineFailure> {
            Ok(self.staged.clone())
        }

        async fn remove(&mut self, _name: &str) -> Result<(), EngineFailure> {
            Ok(())
        }
    }

    fn offset(ms: i64) -> SyncOffset {
        SyncOffset::new(ms).unwrap()
    }

    /// Settings whose folders all live under `root`.
    fn settings_in(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.logs_folder = root.join("logs").display().to_string();
        settings.paths.output_folder = root.join("out").display().to_string();
        settings.paths.temp_root = root.join("tmp").display().to_string();
        settings
    }

    #[tokio::test]
    async fn correct_runs_plan_with_configured_codec() {
        let dir = tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.engine.audio_codec = "libopus".to_string();
        let request = CorrectionRequest::new(
            offset(-300),
            TrackDescriptor::audio_video(),
            settings,
            b"movie".to_vec(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut engine = CopyEngine::default();

        let artifact = correct(
            request,
            &mut engine,
            Some(Box::new(move |p| sink.lock().push(p))),
        )
        .await
        .unwrap();

        assert_eq!(artifact.bytes, b"movie".to_vec());
        assert_eq!(&engine.args[..2], ["-ss", "0.3"]);
        assert!(engine.args.windows(2).any(|w| w == ["-c:a", "libopus"]));
        assert_eq!(*seen.lock(), vec![0.5]);
    }

    #[tokio::test]
    async fn invalid_upload_never_touches_engine() {
        let request = CorrectionRequest::new(
            offset(100),
            TrackDescriptor::audio_video(),
            Settings::default(),
            Vec::new(),
        )
        .with_upload(UploadCandidate::new("notes.txt", "text/plain", 10));
        let mut engine = CopyEngine::default();

        let err = correct(request, &mut engine, None).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Input(InputError::UnsupportedType(_))));
        assert!(!engine.touched);
    }

    #[tokio::test]
    async fn missing_audio_never_touches_engine() {
        let request = CorrectionRequest::new(
            offset(-100),
            TrackDescriptor::new(true, false),
            Settings::default(),
            Vec::new(),
        );
        let mut engine = CopyEngine::default();

        let err = correct(request, &mut engine, None).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Plan(PlanError::InvalidTrack { .. })));
        assert!(!engine.touched);
    }

    #[tokio::test]
    async fn session_log_is_written() {
        let dir = tempdir().unwrap();
        let request = CorrectionRequest::new(
            offset(500),
            TrackDescriptor::audio_video(),
            Settings::default(),
            b"movie".to_vec(),
        )
        .with_log_dir(dir.path());
        let mut engine = CopyEngine::default();

        correct(request, &mut engine, None).await.unwrap();

        let logs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(logs.len(), 1);
        let content = std::fs::read_to_string(&logs[0]).unwrap();
        assert!(content.contains("=== Executing ==="));
        assert!(content.contains("$ copy -i input.mp4 -itsoffset 0.5"));
    }

    #[tokio::test]
    async fn log_goes_to_configured_logs_folder_by_default() {
        let dir = tempdir().unwrap();
        let request = CorrectionRequest::new(
            offset(200),
            TrackDescriptor::audio_video(),
            settings_in(dir.path()),
            b"movie".to_vec(),
        );
        let mut engine = CopyEngine::default();

        correct(request, &mut engine, None).await.unwrap();

        let logs: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].extension().is_some_and(|ext| ext == "log"));
    }

    #[tokio::test]
    async fn empty_logs_folder_writes_no_log() {
        let dir = tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.paths.logs_folder = String::new();
        let request = CorrectionRequest::new(
            offset(200),
            TrackDescriptor::audio_video(),
            settings,
            b"movie".to_vec(),
        );
        let mut engine = CopyEngine::default();

        correct(request, &mut engine, None).await.unwrap();

        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn correct_and_save_writes_into_output_folder() {
        let dir = tempdir().unwrap();
        let request = CorrectionRequest::new(
            offset(-100),
            TrackDescriptor::audio_video(),
            settings_in(dir.path()),
            b"movie".to_vec(),
        );
        let mut engine = CopyEngine::default();

        let path = correct_and_save(request, &mut engine, None).await.unwrap();

        assert_eq!(path, dir.path().join("out").join("corrected.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"movie".to_vec());
    }
}
