// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS File Id Table
//!
//! NFSv3 addresses every object by a 64-bit `fileid3`. The federated
//! namespace is path-addressed, so each export keeps a bidirectional
//! path <-> id table. Ids are handed out on first sight of a path and stay
//! stable for the life of the export.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for file handle

use nfsserve::nfs::fileid3;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Id of the export root (`/`)
pub const ROOT_FILEID: fileid3 = 1;

pub struct FileIdTable {
    /// Counter for generating unique fileid3 values
    next_fileid: AtomicU64,
    forward: RwLock<HashMap<fileid3, String>>,
    reverse: RwLock<HashMap<String, fileid3>>,
}

impl FileIdTable {
    pub fn new() -> Self {
        let table = Self {
            next_fileid: AtomicU64::new(ROOT_FILEID + 1),
            forward: RwLock::new(HashMap::new()),
            reverse: RwLock::new(HashMap::new()),
        };
        table.forward.write().insert(ROOT_FILEID, "/".to_string());
        table.reverse.write().insert("/".to_string(), ROOT_FILEID);
        table
    }

    /// Id for `path`, allocating one on first sight
    pub fn register(&self, path: &str) -> fileid3 {
        if let Some(&existing) = self.reverse.read().get(path) {
            return existing;
        }

        let mut reverse = self.reverse.write();
        // Another caller may have registered it between the two locks
        if let Some(&existing) = reverse.get(path) {
            return existing;
        }
        let fileid = self.next_fileid.fetch_add(1, Ordering::SeqCst);
        reverse.insert(path.to_string(), fileid);
        self.forward.write().insert(fileid, path.to_string());

        debug!("Registered file id: fileid={}, path={}", fileid, path);
        fileid
    }

    pub fn path(&self, id: fileid3) -> Option<String> {
        self.forward.read().get(&id).cloned()
    }

    pub fn id(&self, path: &str) -> Option<fileid3> {
        self.reverse.read().get(path).copied()
    }

    /// Move the ids of `from` and everything below it under `to`
    ///
    /// Ids previously held by `to` or its descendants are dropped.
    pub fn rename(&self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let mut reverse = self.reverse.write();
        let mut forward = self.forward.write();

        let clobbered: Vec<String> = reverse
            .keys()
            .filter(|path| in_subtree(path, to))
            .cloned()
            .collect();
        for path in clobbered {
            if let Some(id) = reverse.remove(&path) {
                forward.remove(&id);
            }
        }

        let moved: Vec<(String, fileid3)> = reverse
            .iter()
            .filter(|(path, _)| in_subtree(path, from))
            .map(|(path, &id)| (path.clone(), id))
            .collect();
        for (old, id) in moved {
            let new = format!("{}{}", to, &old[from.len()..]);
            reverse.remove(&old);
            reverse.insert(new.clone(), id);
            forward.insert(id, new);
        }
    }

    /// Drop the ids of `path` and everything below it
    pub fn forget(&self, path: &str) {
        if path == "/" {
            return;
        }
        let mut reverse = self.reverse.write();
        let mut forward = self.forward.write();
        let gone: Vec<String> = reverse
            .keys()
            .filter(|candidate| in_subtree(candidate, path))
            .cloned()
            .collect();
        for candidate in gone {
            if let Some(id) = reverse.remove(&candidate) {
                forward.remove(&id);
            }
        }
    }
}

/// `path` is `root` or lies beneath it
fn in_subtree(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl Default for FileIdTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a parent namespace path and a child name
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of a namespace path; the root is its own parent
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_preregistered() {
        let table = FileIdTable::new();
        assert_eq!(table.path(ROOT_FILEID).as_deref(), Some("/"));
        assert_eq!(table.register("/"), ROOT_FILEID);
    }

    #[test]
    fn test_register_is_stable() {
        let table = FileIdTable::new();
        let a = table.register("/diskA");
        let b = table.register("/diskA/photos");

        assert_ne!(a, b);
        assert_eq!(table.register("/diskA"), a);
        assert_eq!(table.path(b).as_deref(), Some("/diskA/photos"));
    }

    #[test]
    fn test_rename_and_forget() {
        let table = FileIdTable::new();
        let id = table.register("/diskA/a.txt");
        let clobbered = table.register("/diskA/b.txt");

        table.rename("/diskA/a.txt", "/diskA/b.txt");
        assert_eq!(table.id("/diskA/b.txt"), Some(id));
        assert_eq!(table.id("/diskA/a.txt"), None);
        assert_eq!(table.path(clobbered), None);

        table.forget("/diskA/b.txt");
        assert_eq!(table.path(id), None);

        table.forget("/");
        assert_eq!(table.path(ROOT_FILEID).as_deref(), Some("/"));
    }

    #[test]
    fn test_rename_moves_descendants() {
        let table = FileIdTable::new();
        let dir = table.register("/diskA/dir");
        let child = table.register("/diskA/dir/f.txt");
        let sibling = table.register("/diskA/dir2/g.txt");

        table.rename("/diskA/dir", "/diskA/moved");

        assert_eq!(table.path(dir).as_deref(), Some("/diskA/moved"));
        assert_eq!(table.path(child).as_deref(), Some("/diskA/moved/f.txt"));
        assert_eq!(table.id("/diskA/dir/f.txt"), None);
        assert_eq!(table.path(sibling).as_deref(), Some("/diskA/dir2/g.txt"));

        table.rename("/diskA/moved", "/diskA/moved");
        assert_eq!(table.path(child).as_deref(), Some("/diskA/moved/f.txt"));
    }

    #[test]
    fn test_forget_drops_subtree() {
        let table = FileIdTable::new();
        let dir = table.register("/diskA/dir");
        let child = table.register("/diskA/dir/f.txt");
        let sibling = table.register("/diskA/dir2");

        table.forget("/diskA/dir");

        assert_eq!(table.path(dir), None);
        assert_eq!(table.path(child), None);
        assert_eq!(table.path(sibling).as_deref(), Some("/diskA/dir2"));
        assert_ne!(table.register("/diskA/dir/f.txt"), child);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(child_path("/", "diskA"), "/diskA");
        assert_eq!(child_path("/diskA", "x"), "/diskA/x");
        assert_eq!(parent_path("/diskA/x"), "/diskA");
        assert_eq!(parent_path("/diskA"), "/");
        assert_eq!(parent_path("/"), "/");
    }
}
