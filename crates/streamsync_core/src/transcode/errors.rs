//! Error types for transcode sessions.
//!
//! Engine failures are wrapped by the session step that hit them:
//! Session → Step → Engine failure

use std::io;

use thiserror::Error;

use crate::models::TranscodeStatus;

/// Failure reported by a transcoding engine operation.
#[derive(Error, Debug)]
pub enum EngineFailure {
    /// The engine binary could not be found or started.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// An operation was attempted before `load`.
    #[error("Engine is not loaded")]
    NotLoaded,

    /// The engine process exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error inside the engine's working area.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A named file does not exist in the engine's working area.
    #[error("File not found in engine: {0}")]
    FileNotFound(String),

    /// Generic engine failure with message.
    #[error("{0}")]
    Other(String),
}

impl EngineFailure {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(name: impl Into<String>) -> Self {
        Self::FileNotFound(name.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Terminal error of a transcode session.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// The engine could not be loaded.
    #[error("Failed to load transcoding engine: {source}")]
    EngineLoad {
        #[source]
        source: EngineFailure,
    },

    /// The input could not be staged into the engine.
    #[error("Failed to stage input '{name}': {source}")]
    Staging {
        name: String,
        #[source]
        source: EngineFailure,
    },

    /// The engine rejected or failed the remux.
    #[error("Transcode execution failed: {source}")]
    Execution {
        #[source]
        source: EngineFailure,
    },

    /// The output could not be read back from the engine.
    #[error("Failed to retrieve output '{name}': {source}")]
    Retrieval {
        name: String,
        #[source]
        source: EngineFailure,
    },

    /// `run` was called on a session that already ran.
    #[error("Transcode session has already run; create a new session to retry")]
    SessionSpent,

    /// The session was cancelled at a step boundary.
    #[error("Transcode cancelled before {before}")]
    Cancelled { before: TranscodeStatus },
}

impl TranscodeError {
    pub fn engine_load(source: EngineFailure) -> Self {
        Self::EngineLoad { source }
    }

    pub fn staging(name: impl Into<String>, source: EngineFailure) -> Self {
        Self::Staging {
            name: name.into(),
            source,
        }
    }

    pub fn execution(source: EngineFailure) -> Self {
        Self::Execution { source }
    }

    pub fn retrieval(name: impl Into<String>, source: EngineFailure) -> Self {
        Self::Retrieval {
            name: name.into(),
            source,
        }
    }

    pub fn cancelled(before: TranscodeStatus) -> Self {
        Self::Cancelled { before }
    }

    /// The session step that failed, if the error came from an engine step.
    pub fn step(&self) -> Option<TranscodeStatus> {
        match self {
            Self::EngineLoad { .. } => Some(TranscodeStatus::Loading),
            Self::Staging { .. } => Some(TranscodeStatus::Writing),
            Self::Execution { .. } => Some(TranscodeStatus::Executing),
            Self::Retrieval { .. } => Some(TranscodeStatus::Reading),
            Self::SessionSpent | Self::Cancelled { .. } => None,
        }
    }

    /// The underlying engine failure, if any.
    pub fn engine_failure(&self) -> Option<&EngineFailure> {
        match self {
            Self::EngineLoad { source }
            | Self::Staging { source, .. }
            | Self::Execution { source }
            | Self::Retrieval { source, .. } => Some(source),
            Self::SessionSpent | Self::Cancelled { .. } => None,
        }
    }
}

/// Result type for transcode operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;
