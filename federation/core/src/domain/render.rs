// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Render Domain Types
//!
//! The generator seam used by the render dispatcher, the invocation mode of a
//! render and the error taxonomy shared by every format pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for render

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::fs::FsError;

/// How the caller waits on a render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Run on the calling task and return the outcome
    Wait,
    /// Submit to the bounded background pool; failures are logged and dropped
    Detached,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render already in progress for {0}")]
    Busy(PathBuf),

    #[error("No supported thumbnail format for {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Source {path} is {size} bytes, limit is {limit}")]
    SourceTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("No embedded artwork in {0}")]
    NoEmbeddedArtwork(PathBuf),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("External tool failed: {0}")]
    Tool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    TaskFailed(String),
}

impl From<RenderError> for FsError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Busy(path) => FsError::Busy(path.display().to_string()),
            RenderError::UnsupportedFormat(path) => {
                FsError::UnsupportedFormat(path.display().to_string())
            }
            RenderError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                FsError::NotFound(io.to_string())
            }
            other => FsError::Upstream(other.to_string()),
        }
    }
}

/// One format family able to turn a source file into a cache JPEG
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Lower-case extensions (no dot) this generator accepts
    fn extensions(&self) -> &'static [&'static str];

    /// Render `source` into the JPEG at `target`
    ///
    /// Implementations must write atomically: `target` either keeps its old
    /// content or receives the complete new image.
    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_to_fs_error() {
        let busy = FsError::from(RenderError::Busy(PathBuf::from("/a.png")));
        assert!(matches!(busy, FsError::Busy(_)));

        let unsupported = FsError::from(RenderError::UnsupportedFormat(PathBuf::from("/a.txt")));
        assert!(matches!(unsupported, FsError::UnsupportedFormat(_)));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(FsError::from(RenderError::Io(missing)), FsError::NotFound(_)));

        let tool = FsError::from(RenderError::Tool("ffmpeg exited with 1".into()));
        assert!(matches!(tool, FsError::Upstream(ref m) if m.contains("ffmpeg")));
    }
}
