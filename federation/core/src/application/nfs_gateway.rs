// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS Gateway Application Service
//!
//! Manages the lifecycle of the two protocol exports of a node:
//! - the data export, read-write, backed by the data root router
//! - the thumbnail export, read-only, backed by the thumbnail root router
//!
//! Both start and stop together.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for nfs gateway

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::application::federation::FederationService;
use crate::domain::node_config::{ExportConfig, ExportsConfig};
use crate::infrastructure::nfs::server::{NfsExport, NfsServer, NfsServerError};

/// NFS Gateway service errors
#[derive(Debug, Error)]
pub enum NfsGatewayError {
    #[error("NFS exports already running")]
    AlreadyRunning,

    #[error("NFS exports not running")]
    NotRunning,

    #[error("NFS server error: {0}")]
    ServerError(#[from] NfsServerError),
}

/// Health of one export as reported by the admin API
#[derive(Debug, Clone, Serialize)]
pub struct ExportHealth {
    pub name: String,
    pub prefix: String,
    pub port: u16,
    pub read_only: bool,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub struct NfsGatewayService {
    data: NfsServer,
    thumbnails: NfsServer,
    state: Arc<Mutex<GatewayState>>,
}

fn export_server(
    name: &str,
    config: &ExportConfig,
    filesystem: Arc<dyn crate::domain::fs::FileSystem>,
    read_only: bool,
) -> NfsServer {
    let export = NfsExport {
        name: name.to_string(),
        prefix: config.prefix.clone(),
        filesystem,
        read_only,
        uid: config.uid,
        gid: config.gid,
    };
    NfsServer::new(export, config.bind_address.clone(), config.port)
}

impl NfsGatewayService {
    pub fn new(federation: &FederationService, exports: &ExportsConfig) -> Self {
        Self {
            data: export_server("data", &exports.data, federation.data_filesystem(), false),
            thumbnails: export_server(
                "thumbnails",
                &exports.thumbnails,
                federation.thumbnail_filesystem(),
                true,
            ),
            state: Arc::new(Mutex::new(GatewayState::Stopped)),
        }
    }

    /// Bind and serve both exports
    ///
    /// If the thumbnail export fails to bind, the data export is stopped
    /// again before the error is returned.
    pub async fn start_server(&self) -> Result<(), NfsGatewayError> {
        {
            let mut state = self.state.lock();
            if *state != GatewayState::Stopped {
                return Err(NfsGatewayError::AlreadyRunning);
            }
            *state = GatewayState::Starting;
        }

        if let Err(e) = self.data.start().await {
            *self.state.lock() = GatewayState::Stopped;
            return Err(e.into());
        }
        if let Err(e) = self.thumbnails.start().await {
            let stopped = self.data.stop().await;
            *self.state.lock() = GatewayState::Stopped;
            stopped?;
            return Err(e.into());
        }
        *self.state.lock() = GatewayState::Running;

        info!(
            data_port = self.data.bind_port(),
            thumbnail_port = self.thumbnails.bind_port(),
            "NFS exports started"
        );
        Ok(())
    }

    pub async fn stop_server(&self) -> Result<(), NfsGatewayError> {
        {
            let mut state = self.state.lock();
            if *state != GatewayState::Running {
                return Err(NfsGatewayError::NotRunning);
            }
            *state = GatewayState::Stopping;
        }

        let data = self.data.stop().await;
        let thumbnails = self.thumbnails.stop().await;
        *self.state.lock() = GatewayState::Stopped;
        data?;
        thumbnails?;

        info!("NFS exports stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == GatewayState::Running
    }

    pub fn health(&self) -> Vec<ExportHealth> {
        [&self.data, &self.thumbnails]
            .into_iter()
            .map(|server| {
                let export = server.export();
                ExportHealth {
                    name: export.name.clone(),
                    prefix: export.prefix.clone(),
                    port: server.bind_port(),
                    read_only: export.read_only,
                    running: server.is_running(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render_dispatcher::{GeneratorRegistry, RenderDispatcher};

    fn local_exports() -> ExportsConfig {
        let mut exports = ExportsConfig::default();
        exports.data.port = 0;
        exports.thumbnails.port = 0;
        exports
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let dispatcher = Arc::new(RenderDispatcher::new(GeneratorRegistry::new(), 1));
        let federation = FederationService::new("/disk", "/thumb", dispatcher);
        let gateway = NfsGatewayService::new(&federation, &local_exports());

        assert!(!gateway.is_running());
        assert!(matches!(gateway.stop_server().await, Err(NfsGatewayError::NotRunning)));

        gateway.start_server().await.unwrap();
        assert!(gateway.is_running());
        assert!(matches!(gateway.start_server().await, Err(NfsGatewayError::AlreadyRunning)));

        let health = gateway.health();
        assert_eq!(health.len(), 2);
        assert!(health.iter().all(|h| h.running));
        assert!(health.iter().any(|h| h.name == "thumbnails" && h.read_only));

        gateway.stop_server().await.unwrap();
        assert!(!gateway.is_running());
    }

    #[tokio::test]
    async fn test_concurrent_starts_bind_once() {
        let dispatcher = Arc::new(RenderDispatcher::new(GeneratorRegistry::new(), 1));
        let federation = FederationService::new("/disk", "/thumb", dispatcher);
        let gateway = NfsGatewayService::new(&federation, &local_exports());

        let (first, second) = tokio::join!(gateway.start_server(), gateway.start_server());

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert!(matches!(
            if first.is_err() { first } else { second },
            Err(NfsGatewayError::AlreadyRunning)
        ));
        assert!(gateway.is_running());

        gateway.stop_server().await.unwrap();
        assert!(!gateway.is_running());
        gateway.start_server().await.unwrap();
        gateway.stop_server().await.unwrap();
    }
}
