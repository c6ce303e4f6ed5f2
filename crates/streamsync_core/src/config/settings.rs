//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Transcoding engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Upload and analysis service settings.
    #[serde(default)]
    pub upload: UploadSettings,
}

/// Config sections that can be updated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Engine,
    Upload,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Engine,
        ConfigSection::Upload,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Engine => "engine",
            ConfigSection::Upload => "upload",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Engine => "Transcoding engine (ffmpeg) settings",
            ConfigSection::Upload => "Upload validation and analysis service",
        }
    }
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder where corrected files are written.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for engine working directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for session log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "corrected_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Lowest level written to session logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine output lines to show in the error tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log engine arguments one option per line.
    #[serde(default)]
    pub show_args_pretty: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_args_pretty: false,
        }
    }
}

/// Transcoding engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// ffprobe executable.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Name the input is staged under inside the engine.
    #[serde(default = "default_input_name")]
    pub input_name: String,

    /// Name the engine writes the corrected file to.
    #[serde(default = "default_output_name")]
    pub output_name: String,

    /// Encoder used for the re-encoded audio track.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Download file name of the corrected artifact.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    /// MIME type of the corrected artifact.
    #[serde(default = "default_artifact_mime")]
    pub artifact_mime: String,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_input_name() -> String {
    "input.mp4".to_string()
}

fn default_output_name() -> String {
    "output.mp4".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_artifact_name() -> String {
    "corrected.mp4".to_string()
}

fn default_artifact_mime() -> String {
    "video/mp4".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            input_name: default_input_name(),
            output_name: default_output_name(),
            audio_codec: default_audio_codec(),
            artifact_name: default_artifact_name(),
            artifact_mime: default_artifact_mime(),
        }
    }
}

/// Upload validation and analysis service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Largest accepted input file.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Endpoint of the analysis service.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Frame rate the analysis service counts offsets in.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

fn default_max_size_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_service_url() -> String {
    "http://localhost:5000/api/upload".to_string()
}

fn default_frame_rate() -> f64 {
    25.0
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            service_url: default_service_url(),
            frame_rate: default_frame_rate(),
        }
    }
}
