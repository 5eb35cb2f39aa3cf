// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for the node's admin API

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use nasfed_core::domain::worker::WorkerSummary;

#[derive(Debug, Clone)]
pub struct DaemonClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AddWorkerRequest<'a> {
    name: &'a str,
    path: PathBuf,
    thumbnail_store: PathBuf,
    read_only: bool,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        };

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach node; is nasfedd running?")?;

        response
            .error_for_status()
            .context("Health check failed")?
            .json()
            .await
            .context("Failed to parse health response")
    }

    pub async fn list_workers(&self) -> Result<Vec<WorkerSummary>> {
        let response = self
            .client
            .get(format!("{}/api/workers", self.base_url))
            .send()
            .await
            .context("Failed to list workers")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to list workers: {}", error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse worker list")
    }

    pub async fn add_worker(
        &self,
        name: &str,
        path: PathBuf,
        thumbnail_store: PathBuf,
        read_only: bool,
    ) -> Result<WorkerSummary> {
        let request = AddWorkerRequest {
            name,
            path,
            thumbnail_store,
            read_only,
        };
        let response = self
            .client
            .post(format!("{}/api/workers", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to add worker")?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let reason = body["error"].as_str().unwrap_or("unknown error");
            match status {
                StatusCode::CONFLICT => anyhow::bail!("Worker already exists: {}", reason),
                StatusCode::BAD_REQUEST => anyhow::bail!("Rejected: {}", reason),
                _ => anyhow::bail!("Failed to add worker ({}): {}", status, reason),
            }
        }

        response
            .json()
            .await
            .context("Failed to parse worker response")
    }

    pub async fn remove_worker(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/api/workers/{}", self.base_url, name.trim_start_matches('/')))
            .send()
            .await
            .context("Failed to remove worker")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to remove worker: {}", error_text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(DaemonClient::new("127.0.0.1", 9000).unwrap().base_url(), "http://127.0.0.1:9000");
        assert_eq!(
            DaemonClient::new("https://nas.local", 443).unwrap().base_url(),
            "https://nas.local:443"
        );
    }
}
