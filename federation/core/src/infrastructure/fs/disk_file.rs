// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::domain::fs::{FileInfo, FsError, FsFile, OpenFlags, RealEntry};

enum Handle {
    File(File),
    Directory,
}

/// Open handle onto a real file or directory
pub struct DiskFile {
    name: String,
    path: PathBuf,
    handle: Handle,
    writable: bool,
    hidden: Option<fn(&str) -> bool>,
}

impl DiskFile {
    /// Open `path`, reporting `name` as the entry's base name
    ///
    /// Directories opened without write intent yield a listing handle.
    pub async fn open(
        path: &Path,
        name: &str,
        flags: OpenFlags,
        perm: u32,
        writable: bool,
    ) -> Result<Self, FsError> {
        if !flags.has_write_intent() {
            if let Ok(meta) = tokio::fs::metadata(path).await {
                if meta.is_dir() {
                    return Ok(Self {
                        name: name.to_string(),
                        path: path.to_path_buf(),
                        handle: Handle::Directory,
                        writable: false,
                        hidden: None,
                    });
                }
            }
        }

        if flags.has_write_intent() && !writable {
            return Err(FsError::PermissionDenied(format!(
                "{} is read-only",
                path.display()
            )));
        }

        let mut options = OpenOptions::new();
        options
            .read(flags.read || !flags.has_write_intent())
            .write(flags.write)
            .append(flags.append)
            .create(flags.create)
            .create_new(flags.create_new)
            .truncate(flags.truncate);
        #[cfg(unix)]
        options.mode(if perm == 0 { 0o644 } else { perm & 0o7777 });
        #[cfg(not(unix))]
        let _ = perm;

        let file = options.open(path).await?;
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            handle: Handle::File(file),
            writable: flags.has_write_intent(),
            hidden: None,
        })
    }

    /// Read-only handle, used for serving cache files and store directories
    pub async fn open_read_only(path: &Path, name: &str) -> Result<Self, FsError> {
        Self::open(path, name, OpenFlags::read_only(), 0, false).await
    }

    /// Leave names matching `filter` out of directory listings
    pub fn hiding(mut self, filter: fn(&str) -> bool) -> Self {
        self.hidden = Some(filter);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.handle, Handle::Directory)
    }
}

#[async_trait]
impl FsFile for DiskFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        match &mut self.handle {
            Handle::File(file) => Ok(file.read(buf).await?),
            Handle::Directory => Err(FsError::InvalidPath(format!(
                "{} is a directory",
                self.path.display()
            ))),
        }
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable {
            return Err(FsError::PermissionDenied(format!(
                "{} was not opened for writing",
                self.path.display()
            )));
        }
        match &mut self.handle {
            Handle::File(file) => {
                let written = file.write(buf).await?;
                file.flush().await?;
                Ok(written)
            }
            Handle::Directory => Err(FsError::InvalidPath(format!(
                "{} is a directory",
                self.path.display()
            ))),
        }
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        match &mut self.handle {
            Handle::File(file) => Ok(file.seek(pos).await?),
            Handle::Directory => Ok(0),
        }
    }

    async fn readdir(&mut self) -> Result<Vec<FileInfo>, FsError> {
        if !self.is_dir() {
            return Err(FsError::InvalidPath(format!(
                "{} is not a directory",
                self.path.display()
            )));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.hidden.is_some_and(|hide| hide(&name)) {
                continue;
            }
            // Entries can vanish between listing and stat
            match entry.metadata().await {
                Ok(meta) => entries.push(FileInfo::Real(RealEntry::from_metadata(name, &meta))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    async fn stat(&self) -> Result<FileInfo, FsError> {
        let meta = match &self.handle {
            Handle::File(file) => file.metadata().await?,
            Handle::Directory => tokio::fs::metadata(&self.path).await?,
        };
        Ok(FileInfo::Real(RealEntry::from_metadata(self.name.clone(), &meta)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_seek() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");

        let mut file = DiskFile::open(&path, "notes.txt", OpenFlags::create_truncate(), 0o600, true)
            .await
            .unwrap();
        assert_eq!(file.write(b"hello world").await.unwrap(), 11);
        assert_eq!(file.seek(SeekFrom::Start(6)).await.unwrap(), 6);

        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf, b"world");

        let info = file.stat().await.unwrap();
        assert_eq!(info.name(), "notes.txt");
        assert_eq!(info.size(), 11);
        assert!(!info.is_dir());
    }

    #[tokio::test]
    async fn test_read_only_handle_rejects_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let mut file = DiskFile::open_read_only(&path, "a.jpg").await.unwrap();
        assert!(matches!(
            file.write(b"x").await,
            Err(FsError::PermissionDenied(_))
        ));

        assert!(matches!(
            DiskFile::open(&path, "a.jpg", OpenFlags::read_write(), 0, false).await,
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("one.png"), b"1").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();

        let mut handle = DiskFile::open_read_only(dir.path(), "root").await.unwrap();
        assert!(handle.is_dir());

        let mut listing: Vec<(String, bool)> = handle
            .readdir()
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.name().to_string(), i.is_dir()))
            .collect();
        listing.sort();
        assert_eq!(
            listing,
            vec![("one.png".to_string(), false), ("sub".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = DiskFile::open_read_only(&dir.path().join("nope"), "nope").await;
        assert!(matches!(result, Err(FsError::NotFound(_))));
    }
}
