// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon composition and lifecycle

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use nasfed_core::{
    application::{federation::FederationService, nfs_gateway::NfsGatewayService},
    domain::node_config::NodeConfigManifest,
    infrastructure::runtime_check,
    presentation::api::{app, AppState},
};

pub async fn start_daemon(config_path: Option<PathBuf>) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    info!("Configuration loaded: node={}", config.metadata.name);

    runtime_check::report(&runtime_check::check_external_tools(&config.spec.render));

    let federation = Arc::new(
        FederationService::from_config(&config).context("Failed to register configured workers")?,
    );
    info!(workers = ?federation.worker_names(), "Federation ready");

    let gateway = Arc::new(NfsGatewayService::new(&federation, &config.spec.exports));
    gateway
        .start_server()
        .await
        .context("Failed to start NFS exports")?;

    let router = app(AppState::new(federation.clone(), Some(gateway.clone())));
    let addr = format!("{}:{}", config.spec.api.host, config.spec.api.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            gateway.stop_server().await.ok();
            return Err(e).with_context(|| format!("Failed to bind to {}", addr));
        }
    };

    info!("Admin API listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Storage node shutting down");
    if let Err(e) = gateway.stop_server().await {
        error!("Failed to stop NFS exports cleanly: {}", e);
    }

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
