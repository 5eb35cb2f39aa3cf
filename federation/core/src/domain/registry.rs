// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Worker Registry
//!
//! The single owner of every registered [`Worker`]. Routers never see the
//! registry itself; they receive an `Arc<dyn WorkerLookup>` which only
//! resolves and enumerates names.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::worker::{NodeName, Worker, WorkerError};

/// Read-only capability into the registry handed to routers
pub trait WorkerLookup: Send + Sync {
    /// Resolve a logical name (with or without its leading `/`)
    fn lookup(&self, name: &str) -> Option<Arc<Worker>>;

    /// Snapshot of registered names, each with a leading `/`, unordered
    fn names(&self) -> Vec<String>;
}

/// Concurrent map of logical name to worker
#[derive(Default)]
pub struct WorkerRegistry {
    workers: DashMap<NodeName, Arc<Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a worker; fails without touching existing state on a duplicate name
    pub fn register(&self, worker: Worker) -> Result<Arc<Worker>, WorkerError> {
        match self.workers.entry(worker.name().clone()) {
            Entry::Occupied(existing) => Err(WorkerError::AlreadyExists(
                existing.key().segment().to_string(),
            )),
            Entry::Vacant(slot) => {
                let worker = Arc::new(worker);
                slot.insert(worker.clone());
                tracing::info!(worker = %worker.name(), path = %worker.serve_path().display(), "Registered worker");
                Ok(worker)
            }
        }
    }

    /// Remove a worker by name; absent names are ignored
    pub fn unregister(&self, name: &str) -> Option<Arc<Worker>> {
        let removed = self.workers.remove(&NodeName::new(name)).map(|(_, w)| w);
        if let Some(worker) = &removed {
            tracing::info!(worker = %worker.name(), "Unregistered worker");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workers.contains_key(&NodeName::new(name))
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn list(&self) -> Vec<Arc<Worker>> {
        self.workers.iter().map(|e| e.value().clone()).collect()
    }
}

impl WorkerLookup for WorkerRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<Worker>> {
        self.workers
            .get(&NodeName::new(name))
            .map(|e| e.value().clone())
    }

    fn names(&self) -> Vec<String> {
        self.workers
            .iter()
            .map(|e| e.key().as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fs::{FileInfo, FileSystem, FsError, FsFile, OpenFlags};
    use crate::domain::worker::WorkerOptions;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct NullFs;

    #[async_trait]
    impl FileSystem for NullFs {
        async fn mkdir(&self, _name: &str, _perm: u32) -> Result<(), FsError> {
            Ok(())
        }

        async fn open_file(
            &self,
            name: &str,
            _flags: OpenFlags,
            _perm: u32,
        ) -> Result<Box<dyn FsFile>, FsError> {
            Err(FsError::NotFound(name.to_string()))
        }

        async fn remove_all(&self, _name: &str) -> Result<(), FsError> {
            Ok(())
        }

        async fn rename(&self, _old: &str, _new: &str) -> Result<(), FsError> {
            Ok(())
        }

        async fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
            Err(FsError::NotFound(name.to_string()))
        }
    }

    fn worker(name: &str, path: &str) -> Worker {
        Worker::new(
            NodeName::new(name),
            PathBuf::from(path),
            PathBuf::from("/tmp/thumbs"),
            WorkerOptions::default(),
            Arc::new(NullFs),
            Arc::new(NullFs),
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = WorkerRegistry::new();
        registry.register(worker("diskA", "/srv/a")).unwrap();

        assert!(registry.lookup("diskA").is_some());
        assert!(registry.lookup("/diskA").is_some());
        assert!(registry.lookup("diskB").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = WorkerRegistry::new();
        registry.register(worker("diskA", "/srv/a")).unwrap();

        let err = registry.register(worker("/diskA", "/srv/other")).unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyExists(ref n) if n == "diskA"));

        let kept = registry.lookup("diskA").unwrap();
        assert_eq!(kept.serve_path(), PathBuf::from("/srv/a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = WorkerRegistry::new();
        assert!(registry.unregister("ghost").is_none());

        registry.register(worker("diskA", "/srv/a")).unwrap();
        assert!(registry.unregister("diskA").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_is_a_snapshot() {
        let registry = WorkerRegistry::new();
        registry.register(worker("diskA", "/srv/a")).unwrap();
        registry.register(worker("diskB", "/srv/b")).unwrap();

        let mut names = registry.names();
        registry.unregister("diskA");
        names.sort();

        assert_eq!(names, vec!["/diskA", "/diskB"]);
        assert_eq!(registry.names(), vec!["/diskB"]);
    }
}
