//! Log of one correction session, written to a file and/or a callback.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel};

/// Leading marker of a structured log line.
#[derive(Debug, Clone, Copy)]
enum Marker {
    Command,
    Phase,
    Success,
    Warning,
    Error,
}

impl Marker {
    fn apply(self, message: &str) -> String {
        match self {
            Marker::Command => format!("$ {}", message),
            Marker::Phase => format!("=== {} ===", message),
            Marker::Success => format!("[SUCCESS] {}", message),
            Marker::Warning => format!("[WARNING] {}", message),
            Marker::Error => format!("[ERROR] {}", message),
        }
    }
}

/// Logger for one correction session.
pub struct SessionLogger {
    /// Session name for identification.
    name: String,
    /// Path to log file, if file output is enabled.
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    /// Recent engine output lines.
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl SessionLogger {
    /// Start building a logger for the named session.
    pub fn builder(name: impl Into<String>) -> SessionLoggerBuilder {
        SessionLoggerBuilder::new(name)
    }

    /// Logger with no file and no callback; messages only reach `tracing`.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback: None,
            config: LogConfig::default(),
            tail_buffer: Mutex::new(VecDeque::new()),
            last_progress: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at `level`, if the configured level lets it through.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(level, &self.format_message(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &Marker::Warning.apply(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &Marker::Error.apply(message));
    }

    /// The engine command line about to run.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &Marker::Command.apply(command));
    }

    /// Start of a session step.
    pub fn phase(&self, step: &str) {
        self.log(LogLevel::Info, &Marker::Phase.apply(step));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &Marker::Success.apply(message));
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            // Only log at step intervals (e.g., 0%, 20%, 40%, ...)
            if let Some(previous) = *last {
                let current_step = (percent / step) * step;
                let last_step = (previous / step) * step;
                if current_step <= last_step && percent < 100 {
                    return false;
                }
                if percent >= 100 && previous >= 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Log an engine output line.
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail.max(1) {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact || LogLevel::Debug < self.config.level {
            return;
        }
        self.output(LogLevel::Debug, &self.format_message(line));
    }

    /// Show the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(LogLevel::Error, &self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(LogLevel::Error, &self.format_message(line));
        }
    }

    /// Most recent engine output lines, oldest first.
    pub fn tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Log engine arguments one option per line.
    pub fn log_args_pretty(&self, pretty: &str) {
        self.info("--- engine arguments ---");
        for line in pretty.lines() {
            self.info(line);
        }
        self.info("------------------------");
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, level: LogLevel, formatted: &str) {
        let session = self.name.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(session, "{}", formatted),
            LogLevel::Debug => tracing::debug!(session, "{}", formatted),
            LogLevel::Info => tracing::info!(session, "{}", formatted),
            LogLevel::Warn => tracing::warn!(session, "{}", formatted),
            LogLevel::Error => tracing::error!(session, "{}", formatted),
        }

        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Builder for [`SessionLogger`].
pub struct SessionLoggerBuilder {
    name: String,
    log_dir: Option<PathBuf>,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl SessionLoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_dir: None,
            config: LogConfig::default(),
            callback: None,
        }
    }

    /// Write the log to `<dir>/<name>.log`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.config.show_timestamps = show;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Build the logger, creating the log file if a directory was set.
    pub fn build(self) -> std::io::Result<SessionLogger> {
        let (log_path, writer) = match self.log_dir {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{}.log", sanitize_filename(&self.name)));
                let file = File::create(&path)?;
                (Some(path), Some(BufWriter::new(file)))
            }
            None => (None, None),
        };

        Ok(SessionLogger {
            name: self.name,
            log_path,
            file_writer: Mutex::new(writer),
            callback: self.callback,
            config: self.config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(32)),
            last_progress: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn capturing(config: LogConfig) -> (SessionLogger, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger = SessionLogger::builder("test")
            .config(config)
            .show_timestamps(false)
            .callback(Box::new(move |line| sink.lock().push(line.to_string())))
            .build()
            .unwrap();
        (logger, lines)
    }

    #[test]
    fn writes_log_file() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::builder("run:1")
            .log_dir(dir.path())
            .build()
            .unwrap();

        logger.phase("Loading");
        logger.close();

        let path = logger.log_path().unwrap().to_path_buf();
        assert!(path.ends_with("run_1.log"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("=== Loading ==="));
    }

    #[test]
    fn compact_mode_filters_progress() {
        let (logger, lines) = capturing(LogConfig::default());

        assert!(logger.progress(0));
        assert!(!logger.progress(5));
        assert!(logger.progress(21));
        assert!(!logger.progress(39));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));

        assert_eq!(lines.lock().len(), 3);
    }

    #[test]
    fn level_filters_debug() {
        let (logger, lines) = capturing(LogConfig::default());
        logger.debug("hidden");
        logger.warn("shown");
        assert_eq!(*lines.lock(), vec!["[WARNING] shown".to_string()]);
    }

    #[test]
    fn tail_keeps_recent_output() {
        let config = LogConfig {
            error_tail: 2,
            ..LogConfig::default()
        };
        let (logger, lines) = capturing(config);

        logger.output_line("a");
        logger.output_line("b");
        logger.output_line("c");
        assert!(lines.lock().is_empty());
        assert_eq!(logger.tail(), vec!["b".to_string(), "c".to_string()]);

        logger.show_tail("ffmpeg");
        assert_eq!(lines.lock()[0], "[ffmpeg/tail]");
    }

    #[test]
    fn configured_level_drops_quieter_lines() {
        let settings = crate::config::LoggingSettings {
            level: LogLevel::Warn,
            compact: false,
            ..Default::default()
        };
        let (logger, lines) = capturing(LogConfig::from_settings(&settings));

        logger.phase("Executing");
        logger.output_line("frame=1");
        logger.error("boom");

        assert_eq!(*lines.lock(), vec!["[ERROR] boom".to_string()]);
        assert_eq!(logger.tail(), vec!["frame=1".to_string()]);
    }
}
