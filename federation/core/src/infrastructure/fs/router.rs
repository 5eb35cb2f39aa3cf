// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Root Router
//!
//! Implements the filesystem contract at the root of the federated namespace.
//! The first path segment selects a worker through the registry lookup and
//! the call is forwarded, path unchanged, to that worker's data or thumbnail
//! adapter. The root itself is synthesized from the registry on every call.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for router

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::fs::{FileInfo, FileSystem, FsError, FsFile, OpenFlags};
use crate::domain::path_sanitizer::{first_segment, is_top_level, PathSanitizer};
use crate::domain::registry::WorkerLookup;
use crate::domain::virtual_entry::{SyntheticDirectoryEntry, VirtualDirectory};
use crate::domain::worker::Worker;

/// Which adapter of a worker a router forwards to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    Data,
    Thumbnail,
}

impl std::fmt::Display for RouterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterKind::Data => write!(f, "data"),
            RouterKind::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

/// `disk` and `/disk` both become `/disk/`
pub fn normalize_prefix(prefix: &str) -> String {
    format!("/{}/", prefix.trim_matches('/'))
}

pub struct RootRouter {
    kind: RouterKind,
    prefix: String,
    workers: Arc<dyn WorkerLookup>,
    sanitizer: PathSanitizer,
}

impl RootRouter {
    pub fn new(kind: RouterKind, prefix: &str, workers: Arc<dyn WorkerLookup>) -> Self {
        Self {
            kind,
            prefix: normalize_prefix(prefix),
            workers,
            sanitizer: PathSanitizer::new(),
        }
    }

    pub fn kind(&self) -> RouterKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Strip the mount prefix and canonicalize; `/` is the namespace root
    fn clean(&self, name: &str) -> Result<String, FsError> {
        let stripped = self.sanitizer.strip_mount_prefix(name, &self.prefix);
        Ok(self.sanitizer.canonicalize(&stripped)?)
    }

    fn resolve(&self, clean: &str) -> Result<Arc<Worker>, FsError> {
        let segment = first_segment(clean)
            .ok_or_else(|| FsError::NotFound(clean.to_string()))?;
        self.workers
            .lookup(segment)
            .ok_or_else(|| FsError::NotFound(format!("no worker named {}", segment)))
    }

    fn adapter<'a>(&self, worker: &'a Worker) -> &'a Arc<dyn FileSystem> {
        match self.kind {
            RouterKind::Data => worker.disk(),
            RouterKind::Thumbnail => worker.thumbnails(),
        }
    }

    /// Root-level structural change: ignored on data, refused on thumbnails
    fn root_mutation(&self, op: &str, path: &str) -> Result<(), FsError> {
        match self.kind {
            RouterKind::Data => {
                info!(router = %self.kind, op, path, "Ignoring mutation at namespace root");
                Ok(())
            }
            RouterKind::Thumbnail => Err(FsError::PermissionDenied(format!(
                "{} {}: the thumbnail namespace is read-only",
                op, path
            ))),
        }
    }
}

#[async_trait]
impl FileSystem for RootRouter {
    async fn mkdir(&self, name: &str, perm: u32) -> Result<(), FsError> {
        let clean = self.clean(name)?;
        debug!(router = %self.kind, path = %clean, "mkdir");
        if is_top_level(&clean) {
            return self.root_mutation("mkdir", &clean);
        }
        let worker = self.resolve(&clean)?;
        self.adapter(&worker).mkdir(&clean, perm).await
    }

    async fn open_file(
        &self,
        name: &str,
        flags: OpenFlags,
        perm: u32,
    ) -> Result<Box<dyn FsFile>, FsError> {
        let clean = self.clean(name)?;
        debug!(router = %self.kind, path = %clean, ?flags, "open");
        if clean == "/" {
            return Ok(Box::new(VirtualDirectory::root(self.workers.clone())));
        }
        let worker = self.resolve(&clean)?;
        self.adapter(&worker).open_file(&clean, flags, perm).await
    }

    async fn remove_all(&self, name: &str) -> Result<(), FsError> {
        let clean = self.clean(name)?;
        debug!(router = %self.kind, path = %clean, "remove_all");
        if is_top_level(&clean) {
            info!(router = %self.kind, path = %clean, "Ignoring removal at namespace root");
            return Ok(());
        }
        let worker = self.resolve(&clean)?;
        self.adapter(&worker).remove_all(&clean).await
    }

    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), FsError> {
        let from = self.clean(old_name)?;
        let to = self.clean(new_name)?;
        debug!(router = %self.kind, from = %from, to = %to, "rename");
        if is_top_level(&from) || is_top_level(&to) {
            return self.root_mutation("rename", &from);
        }

        let worker = self.resolve(&from)?;
        if first_segment(&from) != first_segment(&to) {
            return Err(FsError::InvalidPath(format!(
                "cannot rename {} to {} across workers",
                from, to
            )));
        }
        self.adapter(&worker).rename(&from, &to).await
    }

    async fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let clean = self.clean(name)?;
        debug!(router = %self.kind, path = %clean, "stat");
        if clean == "/" {
            return Ok(FileInfo::Synthetic(SyntheticDirectoryEntry::new("/")));
        }

        let worker = self.resolve(&clean)?;
        match self.adapter(&worker).stat(&clean).await {
            Err(FsError::NotFound(_)) if is_top_level(&clean) => Ok(FileInfo::Synthetic(
                SyntheticDirectoryEntry::new(worker.name().segment()),
            )),
            other => other,
        }
    }
}
