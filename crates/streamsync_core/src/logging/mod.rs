//! Correction session logs and process-wide tracing setup.
//!
//! A [`SessionLogger`] records one correction run: step markers, the
//! engine command line, thinned-out progress and, on failure, the tail of
//! the engine's output. Every line is also forwarded to `tracing` at its
//! own level.
//!
//! ```no_run
//! use streamsync_core::config::LoggingSettings;
//! use streamsync_core::logging::{LogConfig, SessionLogger};
//!
//! let logger = SessionLogger::builder("correction")
//!     .log_dir(".logs")
//!     .config(LogConfig::from_settings(&LoggingSettings::default()))
//!     .build()
//!     .unwrap();
//!
//! logger.phase("Executing");
//! logger.command("ffmpeg -i input.mp4 ...");
//! logger.progress(50);
//! ```

mod session_logger;
mod types;

pub use session_logger::{SessionLogger, SessionLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
