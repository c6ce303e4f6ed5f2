//! Correction planning.
//!
//! This module turns a sync offset into an engine command.
//!
//! # Architecture
//!
//! - **plan_builder**: Builds a `RemuxPlan` from an offset and track descriptor
//! - **args_builder**: Converts a `RemuxPlan` into ffmpeg argument tokens

mod args_builder;
mod plan_builder;

pub use args_builder::{format_args_pretty, format_seconds, FfmpegArgsBuilder};
pub use plan_builder::{
    build_remux_plan, build_remux_plan_with_codec, PlanError, DEFAULT_AUDIO_CODEC,
};
