// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Virtual Directory Entries
//!
//! Synthetic directories have no backing storage and no identity beyond their
//! name. They are regenerated on every query, so a listing of the namespace
//! root always reflects the registry as it is right now.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for virtual entries

use async_trait::async_trait;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use crate::domain::fs::{FileInfo, FsError, FsFile};
use crate::domain::registry::WorkerLookup;

/// Directory metadata invented by a router (size 0, mode directory, mtime now)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticDirectoryEntry {
    name: String,
    modified: SystemTime,
}

impl SyntheticDirectoryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: SystemTime::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn mode(&self) -> u32 {
        0o755
    }
}

/// Handle onto the synthesized namespace root
///
/// Lists one synthetic directory per registered worker. Reads return zero
/// bytes and writes are rejected.
pub struct VirtualDirectory {
    entry: SyntheticDirectoryEntry,
    workers: Arc<dyn WorkerLookup>,
}

impl VirtualDirectory {
    pub fn root(workers: Arc<dyn WorkerLookup>) -> Self {
        Self {
            entry: SyntheticDirectoryEntry::new("/"),
            workers,
        }
    }
}

#[async_trait]
impl FsFile for VirtualDirectory {
    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, FsError> {
        Ok(0)
    }

    async fn write(&mut self, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::PermissionDenied(
            "write operation not allowed: this part of the file system is read-only".to_string(),
        ))
    }

    async fn seek(&mut self, _pos: SeekFrom) -> Result<u64, FsError> {
        Ok(0)
    }

    async fn readdir(&mut self) -> Result<Vec<FileInfo>, FsError> {
        let names = self.workers.names();
        tracing::debug!(count = names.len(), "Listing virtual root");
        Ok(names
            .iter()
            .map(|name| {
                FileInfo::Synthetic(SyntheticDirectoryEntry::new(name.trim_start_matches('/')))
            })
            .collect())
    }

    async fn stat(&self) -> Result<FileInfo, FsError> {
        Ok(FileInfo::Synthetic(self.entry.clone()))
    }
}
