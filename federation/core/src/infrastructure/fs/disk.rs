// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Disk File-System Adapter
//!
//! Maps `/<worker>/<rest>` onto `<backing-dir>/<rest>` and otherwise behaves
//! like direct filesystem access. A worker marked read-only refuses every
//! mutating call with `PermissionDenied`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for disk

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::disk_file::DiskFile;
use crate::domain::fs::{FileInfo, FileSystem, FsError, FsFile, OpenFlags, RealEntry};
use crate::domain::path_sanitizer::PathSanitizer;
use crate::domain::worker::{NodeName, WorkerError};

pub struct DiskFileSystem {
    node: NodeName,
    root: PathBuf,
    read_only: bool,
    sanitizer: PathSanitizer,
}

impl DiskFileSystem {
    /// Fails with `MissingDirectory` unless `root` is an existing directory
    pub fn new(node: NodeName, root: PathBuf, read_only: bool) -> Result<Self, WorkerError> {
        if !root.is_dir() {
            return Err(WorkerError::MissingDirectory(root));
        }
        Ok(Self {
            node,
            root,
            read_only,
            sanitizer: PathSanitizer::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Real path plus the worker-relative part (empty for the worker root)
    fn resolve(&self, name: &str) -> Result<(PathBuf, PathBuf), FsError> {
        let relative = self.sanitizer.strip_node_name(name, self.node.as_str())?;
        Ok((self.root.join(&relative), relative))
    }

    fn base_name(&self, relative: &Path) -> String {
        relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.node.segment().to_string())
    }

    fn ensure_writable(&self, op: &str, name: &str) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::PermissionDenied(format!(
                "{} {}: worker {} is read-only",
                op, name, self.node
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for DiskFileSystem {
    async fn mkdir(&self, name: &str, perm: u32) -> Result<(), FsError> {
        self.ensure_writable("mkdir", name)?;
        let (path, _) = self.resolve(name)?;
        debug!(worker = %self.node, path = %path.display(), "mkdir");

        let mut builder = tokio::fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(if perm == 0 { 0o755 } else { perm & 0o7777 });
        #[cfg(not(unix))]
        let _ = perm;
        builder.create(&path).await?;
        Ok(())
    }

    async fn open_file(
        &self,
        name: &str,
        flags: OpenFlags,
        perm: u32,
    ) -> Result<Box<dyn FsFile>, FsError> {
        if flags.has_write_intent() {
            self.ensure_writable("open", name)?;
        }
        let (path, relative) = self.resolve(name)?;
        let file = DiskFile::open(&path, &self.base_name(&relative), flags, perm, !self.read_only).await?;
        Ok(Box::new(file))
    }

    async fn remove_all(&self, name: &str) -> Result<(), FsError> {
        self.ensure_writable("remove", name)?;
        let (path, relative) = self.resolve(name)?;
        if relative.as_os_str().is_empty() {
            return Err(FsError::PermissionDenied(format!(
                "refusing to remove the root of worker {}",
                self.node
            )));
        }
        debug!(worker = %self.node, path = %path.display(), "remove_all");

        let meta = match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), FsError> {
        self.ensure_writable("rename", old_name)?;
        let (from, from_rel) = self.resolve(old_name)?;
        let (to, to_rel) = self.resolve(new_name)?;
        if from_rel.as_os_str().is_empty() || to_rel.as_os_str().is_empty() {
            return Err(FsError::PermissionDenied(format!(
                "cannot rename the root of worker {}",
                self.node
            )));
        }
        debug!(worker = %self.node, from = %from.display(), to = %to.display(), "rename");
        tokio::fs::rename(&from, &to).await?;
        Ok(())
    }

    async fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let (path, relative) = self.resolve(name)?;
        let meta = tokio::fs::metadata(&path).await?;
        Ok(FileInfo::Real(RealEntry::from_metadata(
            self.base_name(&relative),
            &meta,
        )))
    }
}
