// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Filesystem Capability Contract
//!
//! The path-addressed contract every namespace component implements: the two
//! root routers, the per-worker disk adapter and the per-worker thumbnail
//! adapter. Protocol transports (the NFS gateway) only ever talk to this trait.
//!
//! Metadata is a tagged variant: a [`FileInfo::Real`] entry describes something
//! that exists in a backing directory, a [`FileInfo::Synthetic`] entry is a
//! directory invented by the router (namespace root, worker mount point).

use async_trait::async_trait;
use std::io::SeekFrom;
use std::time::SystemTime;
use thiserror::Error;

use crate::domain::path_sanitizer::PathSanitizerError;
use crate::domain::virtual_entry::SyntheticDirectoryEntry;

/// Open intent for [`FileSystem::open_file`]
///
/// Mirrors the POSIX open flags a remote protocol can express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    /// Fail if the file already exists (exclusive create)
    pub create_new: bool,
    pub truncate: bool,
}

impl OpenFlags {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            create_new: false,
            truncate: false,
        }
    }

    pub const fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            append: false,
            create: false,
            create_new: false,
            truncate: false,
        }
    }

    /// Create or truncate for writing
    pub const fn create_truncate() -> Self {
        Self {
            read: true,
            write: true,
            append: false,
            create: true,
            create_new: false,
            truncate: true,
        }
    }

    /// Create, failing if the file exists
    pub const fn create_exclusive() -> Self {
        Self {
            read: true,
            write: true,
            append: false,
            create: false,
            create_new: true,
            truncate: false,
        }
    }

    pub const fn with_append(mut self) -> Self {
        self.append = true;
        self
    }

    /// True when any flag would let the caller mutate the target
    pub fn has_write_intent(&self) -> bool {
        self.write || self.append || self.create || self.create_new || self.truncate
    }
}

/// Metadata of an entry backed by a real file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealEntry {
    /// Base name (no directory part)
    pub name: String,
    pub size: u64,
    /// POSIX permission bits (e.g. 0o644)
    pub mode: u32,
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl RealEntry {
    pub fn from_metadata(name: impl Into<String>, metadata: &std::fs::Metadata) -> Self {
        let is_dir = metadata.is_dir();
        Self {
            name: name.into(),
            size: if is_dir { 0 } else { metadata.len() },
            mode: permission_bits(metadata),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir,
        }
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// Entry metadata returned by `stat` and directory listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInfo {
    Real(RealEntry),
    Synthetic(SyntheticDirectoryEntry),
}

impl FileInfo {
    pub fn name(&self) -> &str {
        match self {
            FileInfo::Real(entry) => &entry.name,
            FileInfo::Synthetic(entry) => entry.name(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            FileInfo::Real(entry) => entry.size,
            FileInfo::Synthetic(_) => 0,
        }
    }

    pub fn mode(&self) -> u32 {
        match self {
            FileInfo::Real(entry) => entry.mode,
            FileInfo::Synthetic(entry) => entry.mode(),
        }
    }

    pub fn modified(&self) -> SystemTime {
        match self {
            FileInfo::Real(entry) => entry.modified,
            FileInfo::Synthetic(entry) => entry.modified(),
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            FileInfo::Real(entry) => entry.is_dir,
            FileInfo::Synthetic(_) => true,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, FileInfo::Synthetic(_))
    }
}

/// Filesystem errors
///
/// Adapter errors travel through the routers untranslated so the protocol
/// layer can map each variant onto its own wire status.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Render already in progress: {0}")]
    Busy(String),

    #[error("No supported thumbnail format for: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists(err.to_string()),
            _ => FsError::Upstream(err.to_string()),
        }
    }
}

impl From<PathSanitizerError> for FsError {
    fn from(err: PathSanitizerError) -> Self {
        FsError::InvalidPath(err.to_string())
    }
}

/// An open handle returned by [`FileSystem::open_file`]
///
/// Directory handles answer `readdir`; file handles answer `read`/`write`/`seek`.
#[async_trait]
pub trait FsFile: Send {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    async fn write(&mut self, buf: &[u8]) -> Result<usize, FsError>;

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError>;

    /// List every entry of the directory this handle points at
    async fn readdir(&mut self) -> Result<Vec<FileInfo>, FsError>;

    async fn stat(&self) -> Result<FileInfo, FsError>;
}

/// Path-addressed filesystem operations
///
/// Paths are slash-separated and absolute within the implementor's namespace.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn mkdir(&self, name: &str, perm: u32) -> Result<(), FsError>;

    async fn open_file(
        &self,
        name: &str,
        flags: OpenFlags,
        perm: u32,
    ) -> Result<Box<dyn FsFile>, FsError>;

    async fn remove_all(&self, name: &str) -> Result<(), FsError>;

    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), FsError>;

    async fn stat(&self, name: &str) -> Result<FileInfo, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_intent() {
        assert!(!OpenFlags::read_only().has_write_intent());
        assert!(OpenFlags::read_write().has_write_intent());
        assert!(OpenFlags::create_truncate().has_write_intent());
        assert!(OpenFlags::create_exclusive().has_write_intent());
        assert!(OpenFlags::read_only().with_append().has_write_intent());
    }

    #[test]
    fn test_io_error_mapping() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(FsError::from(missing), FsError::NotFound(_)));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(FsError::from(denied), FsError::PermissionDenied(_)));

        let other = std::io::Error::other("disk on fire");
        match FsError::from(other) {
            FsError::Upstream(msg) => assert!(msg.contains("disk on fire")),
            e => panic!("unexpected mapping: {e:?}"),
        }
    }

    #[test]
    fn test_synthetic_info_is_directory() {
        let info = FileInfo::Synthetic(SyntheticDirectoryEntry::new("diskA"));
        assert!(info.is_dir());
        assert!(info.is_synthetic());
        assert_eq!(info.size(), 0);
        assert_eq!(info.name(), "diskA");
    }
}
