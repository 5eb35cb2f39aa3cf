// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Federation Application Service
//!
//! Composition root of the federated namespace. Owns the worker registry, the
//! render dispatcher and the two root routers (data and thumbnails), and
//! builds a worker's disk and thumbnail adapters when it is registered.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for federation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::application::render_dispatcher::RenderDispatcher;
use crate::domain::fs::FileSystem;
use crate::domain::node_config::NodeConfigManifest;
use crate::domain::registry::{WorkerLookup, WorkerRegistry};
use crate::domain::worker::{NodeName, Worker, WorkerError, WorkerOptions, WorkerSummary};
use crate::infrastructure::fs::{DiskFileSystem, RootRouter, RouterKind, ThumbnailFileSystem};
use crate::infrastructure::render::builtin_generators;

pub struct FederationService {
    registry: Arc<WorkerRegistry>,
    dispatcher: Arc<RenderDispatcher>,
    data_router: Arc<RootRouter>,
    thumbnail_router: Arc<RootRouter>,
}

impl FederationService {
    /// Build an empty federation with both routers sharing one registry
    pub fn new(data_prefix: &str, thumbnail_prefix: &str, dispatcher: Arc<RenderDispatcher>) -> Self {
        let registry = Arc::new(WorkerRegistry::new());
        let lookup: Arc<dyn WorkerLookup> = registry.clone();

        Self {
            data_router: Arc::new(RootRouter::new(RouterKind::Data, data_prefix, lookup.clone())),
            thumbnail_router: Arc::new(RootRouter::new(RouterKind::Thumbnail, thumbnail_prefix, lookup)),
            registry,
            dispatcher,
        }
    }

    /// Build from a node manifest and register every configured worker
    pub fn from_config(config: &NodeConfigManifest) -> Result<Self, WorkerError> {
        let spec = &config.spec;
        let dispatcher = Arc::new(RenderDispatcher::new(
            builtin_generators(&spec.render),
            spec.render.max_concurrent_renders,
        ));
        let service = Self::new(&spec.exports.data.prefix, &spec.exports.thumbnails.prefix, dispatcher);

        for worker in &spec.workers {
            service.register_worker(
                &worker.name,
                &worker.path,
                &worker.thumbnail_store,
                WorkerOptions {
                    read_only: worker.read_only,
                },
            )?;
        }
        Ok(service)
    }

    /// Build a worker's adapters and add it to the registry
    ///
    /// Fails with `AlreadyExists` on a duplicate name and `MissingDirectory`
    /// when the backing directory is absent. The thumbnail store is created
    /// if needed.
    pub fn register_worker(
        &self,
        name: &str,
        serve_path: &Path,
        thumbnail_store: &Path,
        options: WorkerOptions,
    ) -> Result<Arc<Worker>, WorkerError> {
        let segment = name.trim_matches('/');
        if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
            return Err(WorkerError::InvalidName(name.to_string()));
        }
        let node = NodeName::new(segment);
        if self.registry.contains(node.as_str()) {
            return Err(WorkerError::AlreadyExists(segment.to_string()));
        }

        let serve_path = std::path::absolute(serve_path)?;
        let thumbnail_store = std::path::absolute(thumbnail_store)?;
        let disk = DiskFileSystem::new(node.clone(), serve_path.clone(), options.read_only)?;
        std::fs::create_dir_all(&thumbnail_store)?;

        let thumbnails = ThumbnailFileSystem::new(
            node.clone(),
            serve_path.clone(),
            thumbnail_store.clone(),
            self.dispatcher.clone(),
        );

        let worker = Worker::new(
            node,
            serve_path,
            thumbnail_store,
            options,
            Arc::new(disk),
            Arc::new(thumbnails),
        );
        self.registry.register(worker)
    }

    /// Remove a worker by name; its directories are left untouched
    pub fn unregister_worker(&self, name: &str) -> Option<Arc<Worker>> {
        self.registry.unregister(name)
    }

    /// Registered names without their leading separator, sorted
    pub fn worker_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .names()
            .into_iter()
            .map(|n| n.trim_start_matches('/').to_string())
            .collect();
        names.sort();
        names
    }

    pub fn list_workers(&self) -> Vec<WorkerSummary> {
        let mut workers: Vec<WorkerSummary> = self.registry.list().iter().map(|w| w.summary()).collect();
        workers.sort_by(|a, b| a.name.cmp(&b.name));
        workers
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<RenderDispatcher> {
        &self.dispatcher
    }

    /// Root router of the live-data namespace
    pub fn data_filesystem(&self) -> Arc<dyn FileSystem> {
        self.data_router.clone()
    }

    /// Root router of the thumbnail namespace
    pub fn thumbnail_filesystem(&self) -> Arc<dyn FileSystem> {
        self.thumbnail_router.clone()
    }

    pub fn data_router(&self) -> &RootRouter {
        &self.data_router
    }

    pub fn thumbnail_router(&self) -> &RootRouter {
        &self.thumbnail_router
    }

    /// Backing directory of a worker, if registered
    pub fn serve_path(&self, name: &str) -> Option<PathBuf> {
        self.registry.lookup(name).map(|w| w.serve_path().to_path_buf())
    }
}
