// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Thumbnail File-System Adapter
//!
//! Read-only view of a worker in which every source file appears as its
//! rendered `<name>.jpg`. Opening a directory schedules background renders for
//! its files and returns the store directory; opening a file renders it on
//! the calling task first.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for thumbnail

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::disk_file::DiskFile;
use crate::application::render_dispatcher::RenderDispatcher;
use crate::domain::fs::{FileInfo, FileSystem, FsError, FsFile, OpenFlags, RealEntry};
use crate::domain::path_sanitizer::PathSanitizer;
use crate::domain::render::RenderMode;
use crate::domain::thumbnail::{is_partial_name, strip_cache_suffix};
use crate::domain::worker::NodeName;

pub struct ThumbnailFileSystem {
    node: NodeName,
    source_root: PathBuf,
    store_root: PathBuf,
    dispatcher: Arc<RenderDispatcher>,
    sanitizer: PathSanitizer,
}

impl ThumbnailFileSystem {
    pub fn new(
        node: NodeName,
        source_root: PathBuf,
        store_root: PathBuf,
        dispatcher: Arc<RenderDispatcher>,
    ) -> Self {
        Self {
            node,
            source_root,
            store_root,
            dispatcher,
            sanitizer: PathSanitizer::new(),
        }
    }

    fn relative(&self, name: &str) -> Result<PathBuf, FsError> {
        Ok(self.sanitizer.strip_node_name(name, self.node.as_str())?)
    }

    fn base_name(&self, relative: &Path) -> String {
        relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.node.segment().to_string())
    }

    fn read_only(&self, op: &str, name: &str) -> FsError {
        FsError::PermissionDenied(format!(
            "{} {}: the thumbnail namespace is read-only",
            op, name
        ))
    }

    /// Mirror the source directory, queue renders for its files, hand back the store directory
    async fn open_directory(&self, relative: &Path) -> Result<Box<dyn FsFile>, FsError> {
        let source_dir = self.source_root.join(relative);
        let store_dir = self.store_root.join(relative);

        // The mirror only exists once the source directory does
        let mut entries = tokio::fs::read_dir(&source_dir).await?;
        tokio::fs::create_dir_all(&store_dir).await?;

        let mut queued = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                tokio::fs::create_dir_all(store_dir.join(entry.file_name())).await?;
            } else if self.dispatcher.generators().supports(&entry.path()) {
                self.dispatcher
                    .render(&entry.path(), &store_dir, RenderMode::Detached)
                    .await?;
                queued += 1;
            }
        }
        debug!(
            worker = %self.node,
            dir = %source_dir.display(),
            queued,
            "Thumbnail directory listing"
        );

        Ok(Box::new(
            DiskFile::open_read_only(&store_dir, &self.base_name(relative))
                .await?
                .hiding(is_partial_name),
        ))
    }

    /// Render one source and open its cache file
    async fn open_thumbnail(&self, relative: &Path) -> Result<Box<dyn FsFile>, FsError> {
        let source_rel = self.resolve_source(relative).await?;
        let source = self.source_root.join(&source_rel);
        let out_dir = match source_rel.parent() {
            Some(parent) => self.store_root.join(parent),
            None => self.store_root.clone(),
        };
        tokio::fs::create_dir_all(&out_dir).await?;

        let cache = self
            .dispatcher
            .render(&source, &out_dir, RenderMode::Wait)
            .await?
            .ok_or_else(|| FsError::Upstream(format!("no thumbnail produced for {}", source.display())))?;

        let name = cache
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Box::new(DiskFile::open_read_only(&cache, &name).await?))
    }

    /// The requested path itself, or the same path without its `.jpg` suffix
    async fn resolve_source(&self, relative: &Path) -> Result<PathBuf, FsError> {
        if is_file(&self.source_root.join(relative)).await {
            return Ok(relative.to_path_buf());
        }
        let rel_str = relative.to_string_lossy();
        if let Some(stripped) = strip_cache_suffix(&rel_str) {
            let candidate = PathBuf::from(stripped);
            if is_file(&self.source_root.join(&candidate)).await {
                return Ok(candidate);
            }
        }
        Err(FsError::NotFound(format!(
            "{}{}",
            self.node,
            if rel_str.is_empty() { String::new() } else { format!("/{}", rel_str) }
        )))
    }

    /// A path is a directory request when its source is a directory, or when
    /// it has no extension and names no source file
    async fn is_directory_request(&self, relative: &Path) -> bool {
        let source = self.source_root.join(relative);
        match tokio::fs::metadata(&source).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => relative.extension().is_none(),
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[async_trait]
impl FileSystem for ThumbnailFileSystem {
    async fn mkdir(&self, name: &str, _perm: u32) -> Result<(), FsError> {
        Err(self.read_only("mkdir", name))
    }

    async fn open_file(
        &self,
        name: &str,
        flags: OpenFlags,
        _perm: u32,
    ) -> Result<Box<dyn FsFile>, FsError> {
        if flags.has_write_intent() {
            return Err(self.read_only("open", name));
        }
        let relative = self.relative(name)?;

        if self.is_directory_request(&relative).await {
            self.open_directory(&relative).await
        } else {
            self.open_thumbnail(&relative).await
        }
    }

    async fn remove_all(&self, name: &str) -> Result<(), FsError> {
        let relative = self.relative(name)?;
        if relative.as_os_str().is_empty() {
            return Err(self.read_only("remove", name));
        }
        let path = self.store_root.join(&relative);
        debug!(worker = %self.node, path = %path.display(), "Removing cached thumbnail");

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

    async fn rename(&self, old_name: &str, _new_name: &str) -> Result<(), FsError> {
        Err(self.read_only("rename", old_name))
    }

    async fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let relative = self.relative(name)?;
        let path = self.store_root.join(&relative);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            // Mirror a source directory the client reached without listing its parent
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let source = self.source_root.join(&relative);
                if !tokio::fs::metadata(&source).await.map(|m| m.is_dir()).unwrap_or(false) {
                    return Err(e.into());
                }
                tokio::fs::create_dir_all(&path).await?;
                tokio::fs::metadata(&path).await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(FileInfo::Real(RealEntry::from_metadata(
            self.base_name(&relative),
            &meta,
        )))
    }
}
