// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::fs::FileSystem;

// ============================================================================
// Value Objects
// ============================================================================

/// Logical worker name, always carrying exactly one leading `/`
///
/// The same value is the registry key and the first segment of every path
/// served by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(String);

impl NodeName {
    pub fn new(name: &str) -> Self {
        Self(format!("/{}", name.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its leading separator, as it appears in listings
    pub fn segment(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavioural switches applied when a worker is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// Reject every mutating call on the data mount
    #[serde(default)]
    pub read_only: bool,
}

/// Errors raised while constructing or registering a worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker already registered: {0}")]
    AlreadyExists(String),

    #[error("Backing directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Invalid worker name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Entity
// ============================================================================

/// A named binding of one backing directory and one thumbnail store
///
/// Immutable once built. Removing a worker from the registry never touches
/// its directories.
pub struct Worker {
    name: NodeName,
    serve_path: PathBuf,
    thumbnail_store: PathBuf,
    options: WorkerOptions,
    created_at: DateTime<Utc>,
    disk: Arc<dyn FileSystem>,
    thumbnails: Arc<dyn FileSystem>,
}

impl Worker {
    pub fn new(
        name: NodeName,
        serve_path: PathBuf,
        thumbnail_store: PathBuf,
        options: WorkerOptions,
        disk: Arc<dyn FileSystem>,
        thumbnails: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            name,
            serve_path,
            thumbnail_store,
            options,
            created_at: Utc::now(),
            disk,
            thumbnails,
        }
    }

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn serve_path(&self) -> &Path {
        &self.serve_path
    }

    pub fn thumbnail_store(&self) -> &Path {
        &self.thumbnail_store
    }

    pub fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Adapter serving raw file content
    pub fn disk(&self) -> &Arc<dyn FileSystem> {
        &self.disk
    }

    /// Adapter serving rendered thumbnails
    pub fn thumbnails(&self) -> &Arc<dyn FileSystem> {
        &self.thumbnails
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            name: self.name.segment().to_string(),
            path: self.serve_path.clone(),
            thumbnail_store: self.thumbnail_store.clone(),
            read_only: self.options.read_only,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("serve_path", &self.serve_path)
            .field("thumbnail_store", &self.thumbnail_store)
            .field("options", &self.options)
            .finish()
    }
}

/// Serializable view of a worker for the admin API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub name: String,
    pub path: PathBuf,
    pub thumbnail_store: PathBuf,
    pub read_only: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_normalization() {
        assert_eq!(NodeName::new("diskA").as_str(), "/diskA");
        assert_eq!(NodeName::new("/diskA").as_str(), "/diskA");
        assert_eq!(NodeName::new("//diskA").as_str(), "/diskA");
        assert_eq!(NodeName::new("diskA").segment(), "diskA");
    }

    #[test]
    fn test_options_default_writable() {
        let opts: WorkerOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.read_only);
    }
}
