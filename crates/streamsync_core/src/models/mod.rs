//! Data models for StreamSync.
//!
//! This module contains the value objects passed between components:
//! - Enums for track kinds, sync direction, preview and transcode status
//! - The validated sync offset
//! - Media descriptors and upload validation
//! - The remux plan produced by the planner

mod enums;
mod media;
mod offset;
mod plan;

// Re-export all public types
pub use enums::{
    CodecMode, PreviewState, RemuxOperation, SyncDirection, TrackKind, TranscodeStatus,
};
pub use media::{validate_upload, InputError, MediaContainer, TrackDescriptor, UploadCandidate};
pub use offset::{OffsetError, SyncOffset, MAX_OFFSET_MS, MIN_OFFSET_MS};
pub use plan::{InputInstance, InputShift, RemuxPlan};
