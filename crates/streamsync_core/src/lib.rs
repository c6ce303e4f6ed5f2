//! StreamSync Core - audio/video offset correction
//!
//! This crate contains the offset model, the remux planner, the
//! synchronized preview scheduler and the transcode session, with zero UI
//! dependencies. Media playback and transcoding are reached through the
//! `PlayableSink` and `TranscodeEngine` traits.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod models;
pub mod planner;
pub mod preview;
pub mod probe;
pub mod transcode;
pub mod workflow;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
