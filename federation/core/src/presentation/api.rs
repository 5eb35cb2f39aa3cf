// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Administrative HTTP API
//!
//! Adds and removes workers at runtime and reports node health.
//!
//! | Method | Path                   | Result                                |
//! |--------|------------------------|---------------------------------------|
//! | GET    | `/health`              | uptime, worker count, export state    |
//! | GET    | `/api/workers`         | registered workers                    |
//! | POST   | `/api/workers`         | 201, 409 duplicate, 400 bad directory |
//! | DELETE | `/api/workers/{name}`  | 204, also for unknown names           |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::application::federation::FederationService;
use crate::application::nfs_gateway::NfsGatewayService;
use crate::domain::worker::{WorkerError, WorkerOptions};

#[derive(Clone)]
pub struct AppState {
    pub federation: Arc<FederationService>,
    pub gateway: Option<Arc<NfsGatewayService>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(federation: Arc<FederationService>, gateway: Option<Arc<NfsGatewayService>>) -> Self {
        Self {
            federation,
            gateway,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/workers", get(list_workers_handler).post(add_worker_handler))
        .route("/api/workers/{name}", delete(remove_worker_handler))
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
pub struct AddWorkerRequest {
    pub name: String,
    pub path: PathBuf,
    pub thumbnail_store: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let exports = state
        .gateway
        .as_ref()
        .map(|g| g.health())
        .unwrap_or_default();

    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "workers": state.federation.registry().len(),
        "in_flight_renders": state.federation.dispatcher().in_flight_count(),
        "exports": exports,
    }))
}

async fn list_workers_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!(state.federation.list_workers()))
}

async fn add_worker_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWorkerRequest>,
) -> Response {
    let options = WorkerOptions {
        read_only: request.read_only,
    };
    match state
        .federation
        .register_worker(&request.name, &request.path, &request.thumbnail_store, options)
    {
        Ok(worker) => {
            info!(worker = %worker.name(), "Worker added through admin API");
            (StatusCode::CREATED, Json(json!(worker.summary()))).into_response()
        }
        Err(e) => {
            let status = match &e {
                WorkerError::AlreadyExists(_) => StatusCode::CONFLICT,
                WorkerError::MissingDirectory(_) | WorkerError::InvalidName(_) => StatusCode::BAD_REQUEST,
                WorkerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!(name = %request.name, error = %e, "Rejected worker registration");
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

async fn remove_worker_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> StatusCode {
    state.federation.unregister_worker(&name);
    StatusCode::NO_CONTENT
}
