//! Configuration management for StreamSync.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use streamsync_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/streamsync.toml");
//! config.load_or_create().unwrap();
//!
//! println!("ffmpeg: {}", config.settings().engine.ffmpeg_path);
//!
//! config.settings_mut().engine.audio_codec = "libopus".to_string();
//! config.update_section(ConfigSection::Engine).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EngineSettings, LoggingSettings, PathSettings, Settings, UploadSettings,
};
