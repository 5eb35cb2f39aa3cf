// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Render Dispatcher Application Service
//!
//! Turns a source file into a cached 480x480 JPEG, at most once at a time per
//! source path.
//!
//! ## Contract
//! 1. A source already marked in flight fails with `Busy` immediately
//! 2. A fresh cache file (strictly newer than the source) is served as is
//! 3. Otherwise the in-flight marker is taken atomically, freshness is checked
//!    again under the marker, and exactly one generator runs, chosen by the
//!    lower-cased extension
//! 4. The marker is released on every exit path by [`InFlightGuard`]
//!
//! `RenderMode::Detached` submits the same operation to a semaphore-bounded
//! pool and logs failures instead of returning them.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for render dispatcher

use dashmap::DashSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::render::{RenderError, RenderMode, ThumbnailGenerator};
use crate::domain::thumbnail::{cache_path, is_fresh, source_extension};

/// Extension to generator lookup
///
/// Registering a generator claims every extension it lists; a later
/// registration for the same extension replaces the earlier one.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    by_extension: HashMap<String, Arc<dyn ThumbnailGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, generator: Arc<dyn ThumbnailGenerator>) {
        for ext in generator.extensions() {
            self.by_extension
                .insert(ext.to_ascii_lowercase(), generator.clone());
        }
    }

    pub fn with(mut self, generator: Arc<dyn ThumbnailGenerator>) -> Self {
        self.register(generator);
        self
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn ThumbnailGenerator>> {
        self.by_extension.get(extension)
    }

    pub fn supports(&self, source: &Path) -> bool {
        source_extension(source)
            .map(|ext| self.by_extension.contains_key(&ext))
            .unwrap_or(false)
    }

    /// Sorted list of claimed extensions
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.by_extension.keys().cloned().collect();
        exts.sort();
        exts
    }
}

/// Holds the in-flight marker for one source path until dropped
pub struct InFlightGuard {
    markers: Arc<DashSet<PathBuf>>,
    key: PathBuf,
}

impl InFlightGuard {
    /// Insert the marker; `None` when another render already holds it
    pub fn acquire(markers: &Arc<DashSet<PathBuf>>, key: &Path) -> Option<Self> {
        if markers.insert(key.to_path_buf()) {
            Some(Self {
                markers: markers.clone(),
                key: key.to_path_buf(),
            })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.markers.remove(&self.key);
    }
}

pub struct RenderDispatcher {
    generators: GeneratorRegistry,
    in_flight: Arc<DashSet<PathBuf>>,
    pool: Arc<Semaphore>,
}

impl RenderDispatcher {
    pub fn new(generators: GeneratorRegistry, max_concurrent_renders: usize) -> Self {
        Self {
            generators,
            in_flight: Arc::new(DashSet::new()),
            pool: Arc::new(Semaphore::new(max_concurrent_renders.max(1))),
        }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn is_in_flight(&self, source: &Path) -> bool {
        self.in_flight.contains(source)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Render `source` into `output_dir` in the requested mode
    ///
    /// `Wait` returns the outcome of this call. `Detached` always returns
    /// `Ok(None)` once the job is queued.
    pub async fn render(
        self: &Arc<Self>,
        source: &Path,
        output_dir: &Path,
        mode: RenderMode,
    ) -> Result<Option<PathBuf>, RenderError> {
        match mode {
            RenderMode::Wait => self.render_now(source, output_dir).await.map(Some),
            RenderMode::Detached => {
                self.submit(source.to_path_buf(), output_dir.to_path_buf());
                Ok(None)
            }
        }
    }

    /// Queue a background render; failures are logged and discarded
    pub fn submit(self: &Arc<Self>, source: PathBuf, output_dir: PathBuf) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = match dispatcher.pool.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            match dispatcher.render_now(&source, &output_dir).await {
                Ok(cache) => debug!(source = %source.display(), cache = %cache.display(), "Background render complete"),
                Err(RenderError::Busy(_)) => {
                    debug!(source = %source.display(), "Background render skipped: already in flight")
                }
                Err(RenderError::UnsupportedFormat(_)) => {
                    debug!(source = %source.display(), "Background render skipped: unsupported format")
                }
                Err(e) => warn!(source = %source.display(), error = %e, "Background render failed"),
            }
        });
    }

    /// Render on the calling task and return the cache file path
    pub async fn render_now(&self, source: &Path, output_dir: &Path) -> Result<PathBuf, RenderError> {
        if self.in_flight.contains(source) {
            return Err(RenderError::Busy(source.to_path_buf()));
        }

        let target = cache_path(output_dir, source);
        if cache_is_fresh(source, &target).await? {
            debug!(source = %source.display(), "Thumbnail cache hit");
            return Ok(target);
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, source)
            .ok_or_else(|| RenderError::Busy(source.to_path_buf()))?;

        // Another render may have finished between the first check and the marker
        if cache_is_fresh(source, &target).await? {
            return Ok(target);
        }

        let generator = source_extension(source)
            .and_then(|ext| self.generators.get(&ext).cloned())
            .ok_or_else(|| RenderError::UnsupportedFormat(source.to_path_buf()))?;

        debug!(
            source = %source.display(),
            generator = generator.name(),
            "Rendering thumbnail"
        );
        generator.generate(source, &target).await?;
        Ok(target)
    }
}

/// Stat both files; a missing source is an error, a missing cache is stale
async fn cache_is_fresh(source: &Path, cache: &Path) -> Result<bool, RenderError> {
    let source_modified = tokio::fs::metadata(source).await?.modified()?;
    match tokio::fs::metadata(cache).await {
        Ok(meta) => Ok(is_fresh(meta.modified()?, source_modified)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
