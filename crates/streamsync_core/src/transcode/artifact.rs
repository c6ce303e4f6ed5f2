//! Corrected output produced by a transcode session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Bytes of a corrected file plus its download metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub bytes: Vec<u8>,
    /// Suggested download name (e.g. `corrected.mp4`).
    pub file_name: String,
    pub mime: String,
}

impl OutputArtifact {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its file name.
    ///
    /// Creates `dir` if needed and returns the written path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Wrote corrected file");
        Ok(path)
    }
}
