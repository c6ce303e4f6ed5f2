//! Session log levels and configuration.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity of a session log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive name understood by `EnvFilter` and the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a correction session writes its log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Keep engine output out of the log (tail only) and thin out progress.
    pub compact: bool,
    /// Progress is logged once per this many percent in compact mode.
    pub progress_step: u32,
    /// Engine output lines kept for the failure tail.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl LogConfig {
    /// Build from the `[logging]` config section.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            progress_step: settings.progress_step,
            error_tail: settings.error_tail as usize,
            show_timestamps: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

/// Callback receiving each formatted log line (e.g. for a log view).
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;
