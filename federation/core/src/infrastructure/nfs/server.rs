// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! NFS Server Implementation
//!
//! User-space NFSv3 server built on the nfsserve crate, exposing one root
//! router per export.
//!
//! ## Architecture
//!
//! ### Component Responsibilities
//! - **FederationNfsAdapter**: Implements `nfsserve::NFSFileSystem`
//!   - Maps NFSv3 RPCs (LOOKUP, GETATTR, READ, WRITE, READDIR, CREATE, MKDIR,
//!     REMOVE, RENAME) onto the path-addressed filesystem contract
//!   - Prefixes every namespace path with the export's mount prefix
//!   - Translates `FsError` into `nfsstat3`
//! - **NfsServer**: Manages server lifecycle and TCP listener
//!   - Spawns a tokio task running `nfsserve::tcp::NFSTcp`
//!   - Stops by aborting that task
//!
//! ## Ownership
//! Every entry reports the export's configured uid/gid. There is no
//! authentication; the export trusts its network.

use nfsserve::nfs::{
    fattr3, fileid3, filename3, ftype3, nfspath3, nfsstat3, nfsstring, nfstime3, sattr3,
    set_size3, specdata3,
};
use nfsserve::tcp::{NFSTcp, NFSTcpListener};
use nfsserve::vfs::{self, NFSFileSystem, VFSCapabilities};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::file_handle::{child_path, parent_path, FileIdTable, ROOT_FILEID};
use crate::domain::fs::{FileInfo, FileSystem, FsError, OpenFlags};

/// NFS server errors
#[derive(Debug, Error)]
pub enum NfsServerError {
    #[error("Failed to bind to {address}: {error}")]
    BindFailed { address: String, error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one export serves and how
#[derive(Clone)]
pub struct NfsExport {
    /// Label used in logs (`data`, `thumbnails`)
    pub name: String,
    /// Router mount prefix prepended to every namespace path
    pub prefix: String,
    pub filesystem: Arc<dyn FileSystem>,
    pub read_only: bool,
    pub uid: u32,
    pub gid: u32,
}

/// Map a filesystem error onto the NFSv3 status a client understands
pub fn nfs_status(err: &FsError, read_only_export: bool) -> nfsstat3 {
    match err {
        FsError::NotFound(_) => nfsstat3::NFS3ERR_NOENT,
        FsError::PermissionDenied(_) if read_only_export => nfsstat3::NFS3ERR_ROFS,
        FsError::PermissionDenied(_) => nfsstat3::NFS3ERR_ACCES,
        FsError::AlreadyExists(_) => nfsstat3::NFS3ERR_EXIST,
        FsError::Busy(_) => nfsstat3::NFS3ERR_JUKEBOX,
        FsError::UnsupportedFormat(_) => nfsstat3::NFS3ERR_NOTSUPP,
        FsError::InvalidPath(_) => nfsstat3::NFS3ERR_INVAL,
        FsError::Upstream(_) => nfsstat3::NFS3ERR_IO,
    }
}

fn to_nfstime(time: SystemTime) -> nfstime3 {
    let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    nfstime3 {
        seconds: since.as_secs() as u32,
        nseconds: since.subsec_nanos(),
    }
}

/// NFS file system adapter over one root router
pub struct FederationNfsAdapter {
    export: NfsExport,
    table: FileIdTable,
}

impl FederationNfsAdapter {
    pub fn new(export: NfsExport) -> Self {
        Self {
            export,
            table: FileIdTable::new(),
        }
    }

    /// Namespace path with the export's mount prefix in front
    fn routed(&self, path: &str) -> String {
        format!("{}{}", self.export.prefix.trim_end_matches('/'), path)
    }

    fn status(&self, op: &str, path: &str, err: FsError) -> nfsstat3 {
        let status = nfs_status(&err, self.export.read_only);
        match err {
            FsError::NotFound(_) | FsError::Busy(_) => {
                debug!(export = %self.export.name, op, path, error = %err, "NFS request failed")
            }
            _ => warn!(export = %self.export.name, op, path, error = %err, "NFS request failed"),
        }
        status
    }

    fn path_of(&self, id: fileid3) -> Result<String, nfsstat3> {
        self.table.path(id).ok_or(nfsstat3::NFS3ERR_STALE)
    }

    fn name_of(filename: &filename3) -> Result<&str, nfsstat3> {
        let name = std::str::from_utf8(filename).map_err(|_| nfsstat3::NFS3ERR_INVAL)?;
        if name.is_empty() || name.contains('/') {
            return Err(nfsstat3::NFS3ERR_INVAL);
        }
        Ok(name)
    }

    fn ensure_writable(&self) -> Result<(), nfsstat3> {
        if self.export.read_only {
            return Err(nfsstat3::NFS3ERR_ROFS);
        }
        Ok(())
    }

    fn to_fattr(&self, id: fileid3, info: &FileInfo) -> fattr3 {
        let is_dir = info.is_dir();
        let mtime = to_nfstime(info.modified());
        fattr3 {
            ftype: if is_dir { ftype3::NF3DIR } else { ftype3::NF3REG },
            mode: info.mode(),
            nlink: if is_dir { 2 } else { 1 },
            uid: self.export.uid,
            gid: self.export.gid,
            size: info.size(),
            used: info.size(),
            rdev: specdata3 {
                specdata1: 0,
                specdata2: 0,
            },
            fsid: 0,
            fileid: id,
            atime: mtime,
            mtime,
            ctime: mtime,
        }
    }

    async fn stat_path(&self, path: &str) -> Result<FileInfo, nfsstat3> {
        self.export
            .filesystem
            .stat(&self.routed(path))
            .await
            .map_err(|e| self.status("stat", path, e))
    }

    async fn create_with(
        &self,
        dirid: fileid3,
        filename: &filename3,
        flags: OpenFlags,
    ) -> Result<(fileid3, fattr3), nfsstat3> {
        self.ensure_writable()?;
        let parent = self.path_of(dirid)?;
        let path = child_path(&parent, Self::name_of(filename)?);

        self.export
            .filesystem
            .open_file(&self.routed(&path), flags, 0o644)
            .await
            .map_err(|e| self.status("create", &path, e))?;

        let fileid = self.table.register(&path);
        let info = self.stat_path(&path).await?;
        Ok((fileid, self.to_fattr(fileid, &info)))
    }
}

#[async_trait::async_trait]
impl NFSFileSystem for FederationNfsAdapter {
    fn root_dir(&self) -> fileid3 {
        ROOT_FILEID
    }

    fn capabilities(&self) -> VFSCapabilities {
        if self.export.read_only {
            VFSCapabilities::ReadOnly
        } else {
            VFSCapabilities::ReadWrite
        }
    }

    async fn lookup(&self, dirid: fileid3, filename: &filename3) -> Result<fileid3, nfsstat3> {
        let parent = self.path_of(dirid)?;
        let name = std::str::from_utf8(filename).map_err(|_| nfsstat3::NFS3ERR_INVAL)?;
        debug!("NFS LOOKUP: dir={}, name={}", parent, name);

        let path = match name {
            "." => return Ok(dirid),
            ".." => parent_path(&parent),
            _ => child_path(&parent, Self::name_of(filename)?),
        };
        self.stat_path(&path).await?;
        Ok(self.table.register(&path))
    }

    async fn getattr(&self, id: fileid3) -> Result<fattr3, nfsstat3> {
        let path = self.path_of(id)?;
        debug!("NFS GETATTR: id={}, path={}", id, path);
        let info = self.stat_path(&path).await?;
        Ok(self.to_fattr(id, &info))
    }

    async fn setattr(&self, id: fileid3, setattr: sattr3) -> Result<fattr3, nfsstat3> {
        let path = self.path_of(id)?;
        debug!("NFS SETATTR: path={}", path);

        // Only truncation to zero is carried out; mode, owner and times are fixed by the export
        if let set_size3::size(0) = setattr.size {
            self.ensure_writable()?;
            let flags = OpenFlags {
                write: true,
                truncate: true,
                ..OpenFlags::default()
            };
            self.export
                .filesystem
                .open_file(&self.routed(&path), flags, 0)
                .await
                .map_err(|e| self.status("setattr", &path, e))?;
        }
        self.getattr(id).await
    }

    async fn read(&self, id: fileid3, offset: u64, count: u32) -> Result<(Vec<u8>, bool), nfsstat3> {
        let path = self.path_of(id)?;
        debug!("NFS READ: path={}, offset={}, count={}", path, offset, count);

        let mut file = self
            .export
            .filesystem
            .open_file(&self.routed(&path), OpenFlags::read_only(), 0)
            .await
            .map_err(|e| self.status("read", &path, e))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.status("read", &path, e))?;

        let mut buf = vec![0u8; count as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .await
                .map_err(|e| self.status("read", &path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        let eof = filled < count as usize;
        Ok((buf, eof))
    }

    async fn write(&self, id: fileid3, offset: u64, data: &[u8]) -> Result<fattr3, nfsstat3> {
        self.ensure_writable()?;
        let path = self.path_of(id)?;
        debug!("NFS WRITE: path={}, offset={}, len={}", path, offset, data.len());

        let mut file = self
            .export
            .filesystem
            .open_file(&self.routed(&path), OpenFlags::read_write(), 0)
            .await
            .map_err(|e| self.status("write", &path, e))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.status("write", &path, e))?;

        let mut written = 0;
        while written < data.len() {
            let n = file
                .write(&data[written..])
                .await
                .map_err(|e| self.status("write", &path, e))?;
            if n == 0 {
                return Err(nfsstat3::NFS3ERR_IO);
            }
            written += n;
        }
        drop(file);
        self.getattr(id).await
    }

    async fn create(
        &self,
        dirid: fileid3,
        filename: &filename3,
        _attr: sattr3,
    ) -> Result<(fileid3, fattr3), nfsstat3> {
        debug!("NFS CREATE: dirid={}, filename={:?}", dirid, filename);
        let flags = OpenFlags {
            read: true,
            write: true,
            create: true,
            ..OpenFlags::default()
        };
        self.create_with(dirid, filename, flags).await
    }

    async fn create_exclusive(&self, dirid: fileid3, filename: &filename3) -> Result<fileid3, nfsstat3> {
        debug!("NFS CREATE_EXCLUSIVE: dirid={}, filename={:?}", dirid, filename);
        let (fileid, _attr) = self
            .create_with(dirid, filename, OpenFlags::create_exclusive())
            .await?;
        Ok(fileid)
    }

    async fn mkdir(&self, dirid: fileid3, dirname: &filename3) -> Result<(fileid3, fattr3), nfsstat3> {
        self.ensure_writable()?;
        let parent = self.path_of(dirid)?;
        let path = child_path(&parent, Self::name_of(dirname)?);
        debug!("NFS MKDIR: path={}", path);

        self.export
            .filesystem
            .mkdir(&self.routed(&path), 0o755)
            .await
            .map_err(|e| self.status("mkdir", &path, e))?;

        let fileid = self.table.register(&path);
        let info = self.stat_path(&path).await?;
        Ok((fileid, self.to_fattr(fileid, &info)))
    }

    async fn remove(&self, dirid: fileid3, filename: &filename3) -> Result<(), nfsstat3> {
        self.ensure_writable()?;
        let parent = self.path_of(dirid)?;
        let path = child_path(&parent, Self::name_of(filename)?);
        debug!("NFS REMOVE: path={}", path);

        self.stat_path(&path).await?;
        self.export
            .filesystem
            .remove_all(&self.routed(&path))
            .await
            .map_err(|e| self.status("remove", &path, e))?;
        self.table.forget(&path);
        Ok(())
    }

    async fn rename(
        &self,
        from_dirid: fileid3,
        from_filename: &filename3,
        to_dirid: fileid3,
        to_filename: &filename3,
    ) -> Result<(), nfsstat3> {
        self.ensure_writable()?;
        let from = child_path(&self.path_of(from_dirid)?, Self::name_of(from_filename)?);
        let to = child_path(&self.path_of(to_dirid)?, Self::name_of(to_filename)?);
        debug!("NFS RENAME: from={}, to={}", from, to);

        self.export
            .filesystem
            .rename(&self.routed(&from), &self.routed(&to))
            .await
            .map_err(|e| self.status("rename", &from, e))?;
        self.table.rename(&from, &to);
        Ok(())
    }

    async fn readdir(
        &self,
        dirid: fileid3,
        start_after: fileid3,
        max_entries: usize,
    ) -> Result<vfs::ReadDirResult, nfsstat3> {
        let dir = self.path_of(dirid)?;
        debug!("NFS READDIR: dir={}, start_after={}, max={}", dir, start_after, max_entries);

        let mut handle = self
            .export
            .filesystem
            .open_file(&self.routed(&dir), OpenFlags::read_only(), 0)
            .await
            .map_err(|e| self.status("readdir", &dir, e))?;
        let mut listing = handle
            .readdir()
            .await
            .map_err(|e| self.status("readdir", &dir, e))?;
        listing.sort_by(|a, b| a.name().cmp(b.name()));

        let ids: Vec<fileid3> = listing
            .iter()
            .map(|info| self.table.register(&child_path(&dir, info.name())))
            .collect();

        let start = if start_after == 0 {
            0
        } else {
            ids.iter()
                .position(|&id| id == start_after)
                .map(|pos| pos + 1)
                .ok_or(nfsstat3::NFS3ERR_BAD_COOKIE)?
        };

        let entries: Vec<vfs::DirEntry> = listing
            .iter()
            .zip(ids.iter())
            .skip(start)
            .take(max_entries)
            .map(|(info, &fileid)| vfs::DirEntry {
                fileid,
                name: nfsstring::from(info.name().as_bytes()),
                attr: self.to_fattr(fileid, info),
            })
            .collect();

        Ok(vfs::ReadDirResult {
            end: start + entries.len() >= listing.len(),
            entries,
        })
    }

    async fn symlink(
        &self,
        dirid: fileid3,
        linkname: &filename3,
        _symlink: &nfspath3,
        _attr: &sattr3,
    ) -> Result<(fileid3, fattr3), nfsstat3> {
        debug!("NFS SYMLINK: dirid={}, linkname={:?}", dirid, linkname);
        Err(nfsstat3::NFS3ERR_NOTSUPP)
    }

    async fn readlink(&self, id: fileid3) -> Result<nfspath3, nfsstat3> {
        debug!("NFS READLINK: id={}", id);
        Err(nfsstat3::NFS3ERR_NOTSUPP)
    }
}

/// NFS Server
///
/// Manages the NFSv3 TCP listener for one export.
pub struct NfsServer {
    export: NfsExport,
    bind_address: String,
    bind_port: u16,
    server_handle: Arc<Mutex<Option<AbortHandle>>>,
}

impl NfsServer {
    pub fn new(export: NfsExport, bind_address: impl Into<String>, bind_port: u16) -> Self {
        Self {
            export,
            bind_address: bind_address.into(),
            bind_port,
            server_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the listener and serve on a background task
    pub async fn start(&self) -> Result<(), NfsServerError> {
        let address = format!("{}:{}", self.bind_address, self.bind_port);
        info!(export = %self.export.name, "Starting NFS server on {}", address);

        let adapter = FederationNfsAdapter::new(self.export.clone());
        let listener = NFSTcpListener::bind(&address, adapter)
            .await
            .map_err(|e| NfsServerError::BindFailed {
                address: address.clone(),
                error: e.to_string(),
            })?;

        let name = self.export.name.clone();
        let handle = tokio::spawn(async move {
            info!(export = %name, "NFS server task started");
            if let Err(e) = listener.handle_forever().await {
                error!(export = %name, "NFS server error: {}", e);
            }
            info!(export = %name, "NFS server task stopped");
        });

        *self.server_handle.lock() = Some(handle.abort_handle());
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), NfsServerError> {
        if let Some(handle) = self.server_handle.lock().take() {
            handle.abort();
            info!(export = %self.export.name, "NFS server stopped");
        } else {
            warn!(export = %self.export.name, "NFS server was not running");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.server_handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn bind_port(&self) -> u16 {
        self.bind_port
    }

    pub fn export(&self) -> &NfsExport {
        &self.export
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let e = |s: &str| s.to_string();
        assert!(matches!(nfs_status(&FsError::NotFound(e("x")), false), nfsstat3::NFS3ERR_NOENT));
        assert!(matches!(nfs_status(&FsError::Busy(e("x")), true), nfsstat3::NFS3ERR_JUKEBOX));
        assert!(matches!(nfs_status(&FsError::UnsupportedFormat(e("x")), true), nfsstat3::NFS3ERR_NOTSUPP));
        assert!(matches!(nfs_status(&FsError::InvalidPath(e("x")), false), nfsstat3::NFS3ERR_INVAL));
        assert!(matches!(nfs_status(&FsError::Upstream(e("x")), false), nfsstat3::NFS3ERR_IO));
    }

    #[test]
    fn test_permission_denied_depends_on_export() {
        let denied = FsError::PermissionDenied("thumbnails".into());
        assert!(matches!(nfs_status(&denied, false), nfsstat3::NFS3ERR_ACCES));
        assert!(matches!(nfs_status(&denied, true), nfsstat3::NFS3ERR_ROFS));
    }
}
