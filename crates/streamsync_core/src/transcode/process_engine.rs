//! Transcoding engine backed by an ffmpeg executable.
//!
//! Files live in a private temporary working directory. ffmpeg runs with
//! `-progress pipe:1` so `out_time_us` lines can be turned into fractional
//! progress against the probed input duration.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::{EngineSettings, PathSettings};
use crate::probe::probe_media;

use super::engine::{EngineProgress, TranscodeEngine};
use super::errors::EngineFailure;

/// Options placed before the plan's arguments on every run.
const GLOBAL_ARGS: [&str; 7] = [
    "-hide_banner",
    "-y",
    "-nostats",
    "-loglevel",
    "error",
    "-progress",
    "pipe:1",
];

/// Drives a local ffmpeg binary.
pub struct ProcessEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    /// Parent for the working directory; system temp dir when unset.
    temp_root: Option<PathBuf>,
    work_dir: Option<TempDir>,
    version: Option<String>,
    output: Vec<String>,
}

impl ProcessEngine {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            temp_root: None,
            work_dir: None,
            version: None,
            output: Vec::new(),
        }
    }

    /// Executables from `[engine]`, working directories under `[paths].temp_root`.
    ///
    /// An empty `temp_root` falls back to the system temp dir.
    pub fn from_settings(engine: &EngineSettings, paths: &PathSettings) -> Self {
        let process = Self::new(&engine.ffmpeg_path, &engine.ffprobe_path);
        if paths.temp_root.is_empty() {
            process
        } else {
            process.with_temp_root(&paths.temp_root)
        }
    }

    /// Create the working directory under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// First line of `ffmpeg -version`, once loaded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_ref().map(TempDir::path)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, EngineFailure> {
        let dir = self.work_dir().ok_or(EngineFailure::NotLoaded)?;
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(EngineFailure::other(format!("Invalid engine file name '{}'", name)));
        }
        Ok(dir.join(name))
    }

    fn create_work_dir(&self) -> Result<TempDir, EngineFailure> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("streamsync-");
        let created = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .map_err(|e| EngineFailure::io("creating temp root", e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        created.map_err(|e| EngineFailure::io("creating working directory", e))
    }

    /// Duration of the first `-i` input, if ffprobe can tell.
    async fn input_duration(&self, args: &[String]) -> Option<f64> {
        let name = args
            .windows(2)
            .find(|pair| pair[0] == "-i")
            .map(|pair| pair[1].as_str())?;
        let path = self.resolve(name).ok()?;
        match probe_media(&self.ffprobe, &path).await {
            Ok(probe) => probe.duration_seconds,
            Err(e) => {
                tracing::debug!("Could not probe input duration: {}", e);
                None
            }
        }
    }
}

impl TranscodeEngine for ProcessEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_loaded(&self) -> bool {
        self.work_dir.is_some()
    }

    async fn load(&mut self) -> Result<(), EngineFailure> {
        if self.is_loaded() {
            return Ok(());
        }

        let output = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                EngineFailure::unavailable(format!("{}: {}", self.ffmpeg.display(), e))
            })?;

        if !output.status.success() {
            return Err(EngineFailure::command_failed(
                "ffmpeg",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        let work_dir = self.create_work_dir()?;

        tracing::info!(version = %version, work_dir = %work_dir.path().display(), "Transcoding engine loaded");
        self.version = Some(version);
        self.work_dir = Some(work_dir);
        Ok(())
    }

    async fn stage(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineFailure> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineFailure::io(format!("writing {}", name), e))?;
        tracing::debug!(name, bytes = bytes.len(), "Staged engine input");
        Ok(())
    }

    async fn execute(
        &mut self,
        args: &[String],
        progress: EngineProgress<'_>,
    ) -> Result<(), EngineFailure> {
        let dir = self.work_dir().ok_or(EngineFailure::NotLoaded)?.to_path_buf();
        let duration = self.input_duration(args).await;

        let mut child = Command::new(&self.ffmpeg)
            .args(GLOBAL_ARGS)
            .args(args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineFailure::unavailable(format!("{}: {}", self.ffmpeg.display(), e)))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut collected = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push(line);
                }
                collected
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| EngineFailure::io("reading ffmpeg progress", e))?
            {
                if let Some(fraction) = progress_fraction(&line, duration) {
                    progress(fraction);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineFailure::io("waiting for ffmpeg", e))?;

        let stderr_lines = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let last_line = stderr_lines.last().cloned().unwrap_or_default();
        self.output.extend(stderr_lines);

        if !status.success() {
            return Err(EngineFailure::command_failed(
                "ffmpeg",
                status.code().unwrap_or(-1),
                last_line,
            ));
        }
        Ok(())
    }

    async fn retrieve(&mut self, name: &str) -> Result<Vec<u8>, EngineFailure> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineFailure::file_not_found(name),
            _ => EngineFailure::io(format!("reading {}", name), e),
        })
    }

    async fn remove(&mut self, name: &str) -> Result<(), EngineFailure> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineFailure::file_not_found(name),
            _ => EngineFailure::io(format!("removing {}", name), e),
        })
    }

    fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

/// Convert one `-progress` line into a fraction of `duration_seconds`.
///
/// `out_time_ms` is also in microseconds despite its name.
fn progress_fraction(line: &str, duration_seconds: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            let duration = duration_seconds.filter(|d| *d > 0.0)?;
            let micros: f64 = value.trim().parse().ok()?;
            Some(micros / 1_000_000.0 / duration)
        }
        "progress" if value.trim() == "end" => Some(1.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_engine() -> ProcessEngine {
        let mut engine = ProcessEngine::new("ffmpeg", "ffprobe");
        engine.work_dir = Some(tempfile::tempdir().unwrap());
        engine
    }

    #[test]
    fn progress_lines_convert_to_fraction() {
        assert_eq!(progress_fraction("out_time_us=5000000", Some(10.0)), Some(0.5));
        assert_eq!(progress_fraction("out_time_ms=2500000", Some(10.0)), Some(0.25));
        assert_eq!(progress_fraction("progress=end", None), Some(1.0));
        assert_eq!(progress_fraction("progress=continue", Some(10.0)), None);
        assert_eq!(progress_fraction("out_time_us=N/A", Some(10.0)), None);
        assert_eq!(progress_fraction("out_time_us=5000000", None), None);
        assert_eq!(progress_fraction("frame=12", Some(10.0)), None);
    }

    #[tokio::test]
    async fn operations_require_load() {
        let mut engine = ProcessEngine::new("ffmpeg", "ffprobe");
        assert!(!engine.is_loaded());
        assert!(matches!(
            engine.stage("input.mp4", b"x").await,
            Err(EngineFailure::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn stage_retrieve_remove_round_trip() {
        let mut engine = loaded_engine();

        engine.stage("input.mp4", b"movie").await.unwrap();
        assert_eq!(engine.retrieve("input.mp4").await.unwrap(), b"movie".to_vec());

        engine.remove("input.mp4").await.unwrap();
        assert!(matches!(
            engine.retrieve("input.mp4").await,
            Err(EngineFailure::FileNotFound(_))
        ));
        assert!(matches!(
            engine.remove("input.mp4").await,
            Err(EngineFailure::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn names_cannot_escape_work_dir() {
        let mut engine = loaded_engine();
        assert!(engine.stage("../escape.mp4", b"x").await.is_err());
        assert!(engine.stage("..", b"x").await.is_err());
    }

    #[tokio::test]
    async fn missing_binary_fails_load() {
        let mut engine = ProcessEngine::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe");
        assert!(matches!(
            engine.load().await,
            Err(EngineFailure::Unavailable(_))
        ));
        assert!(!engine.is_loaded());
    }

    #[test]
    fn temp_root_hosts_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let engine = ProcessEngine::new("ffmpeg", "ffprobe").with_temp_root(root.path().join("work"));
        let dir = engine.create_work_dir().unwrap();
        assert!(dir.path().starts_with(root.path().join("work")));
    }

    #[test]
    fn settings_choose_binaries_and_temp_root() {
        let root = tempfile::tempdir().unwrap();
        let engine_settings = EngineSettings {
            ffmpeg_path: "/opt/ffmpeg/bin/ffmpeg".to_string(),
            ..EngineSettings::default()
        };
        let paths = PathSettings {
            temp_root: root.path().join("scratch").display().to_string(),
            ..PathSettings::default()
        };

        let engine = ProcessEngine::from_settings(&engine_settings, &paths);

        assert_eq!(engine.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(engine.ffprobe, PathBuf::from("ffprobe"));
        let dir = engine.create_work_dir().unwrap();
        assert!(dir.path().starts_with(root.path().join("scratch")));
    }

    #[test]
    fn empty_temp_root_uses_system_temp() {
        let paths = PathSettings {
            temp_root: String::new(),
            ..PathSettings::default()
        };
        let engine = ProcessEngine::from_settings(&EngineSettings::default(), &paths);
        assert!(engine.temp_root.is_none());
    }
}
