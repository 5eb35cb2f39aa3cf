// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Storage Node Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - the two protocol exports (live data, thumbnails)
// - the administrative API listener
// - render pool limits and external tool locations
// - workers registered at startup

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "nasfed/v1";
pub const KIND: &str = "StorageNode";

/// Top-level storage node manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigManifest {
    /// API version (must be "nasfed/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "StorageNode")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: NodeConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Content under `spec:`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfigSpec {
    #[serde(default)]
    pub exports: ExportsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub render: RenderConfig,

    /// Workers registered when the daemon starts
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportsConfig {
    #[serde(default = "default_data_export")]
    pub data: ExportConfig,

    #[serde(default = "default_thumbnail_export")]
    pub thumbnails: ExportConfig,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            data: default_data_export(),
            thumbnails: default_thumbnail_export(),
        }
    }
}

/// One protocol export: the router mount prefix and its listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub prefix: String,

    pub port: u16,

    /// Owner reported for every entry (files are squashed to one identity)
    #[serde(default = "default_owner_id")]
    pub uid: u32,

    #[serde(default = "default_owner_id")]
    pub gid: u32,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_address")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Upper bound on background renders running at once
    #[serde(default = "default_max_concurrent_renders")]
    pub max_concurrent_renders: usize,

    /// Frame extraction tool used for video thumbnails
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Raster sources larger than this are rejected
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: default_max_concurrent_renders(),
            ffmpeg_path: default_ffmpeg_path(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Logical name; first path segment of the worker's mount
    pub name: String,

    /// Backing directory served on the data export
    pub path: PathBuf,

    /// Directory holding rendered thumbnails
    pub thumbnail_store: PathBuf,

    #[serde(default)]
    pub read_only: bool,
}

fn default_data_export() -> ExportConfig {
    ExportConfig {
        prefix: "/disk".to_string(),
        port: 12049,
        uid: default_owner_id(),
        gid: default_owner_id(),
        bind_address: default_bind_address(),
    }
}

fn default_thumbnail_export() -> ExportConfig {
    ExportConfig {
        prefix: "/thumb".to_string(),
        port: 12050,
        uid: default_owner_id(),
        gid: default_owner_id(),
        bind_address: default_bind_address(),
    }
}

fn default_owner_id() -> u32 {
    1000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    9000
}

fn default_max_concurrent_renders() -> usize {
    4
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_max_image_bytes() -> u64 {
    25 * 1024 * 1024
}

impl Default for NodeConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "nasfed-node".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: NodeConfigSpec::default(),
        }
    }
}

impl NodeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. NASFED_CONFIG_PATH environment variable
    /// 2. ./nasfed-config.yaml (working directory)
    /// 3. ~/.nasfed/config.yaml (user home)
    /// 4. /etc/nasfed/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("NASFED_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./nasfed-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nasfed").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/nasfed/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NASFED_API_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: NASFED_API_PORT={}", port);
                    self.spec.api.port = port;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for NASFED_API_PORT: '{}'. Expected a port number. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("NASFED_MAX_RENDERS") {
            match val.parse::<usize>() {
                Ok(limit) => {
                    tracing::info!("Environment override: NASFED_MAX_RENDERS={}", limit);
                    self.spec.render.max_concurrent_renders = limit;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for NASFED_MAX_RENDERS: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("NASFED_FFMPEG_PATH") {
            if !val.is_empty() {
                tracing::info!("Environment override: NASFED_FFMPEG_PATH={}", val);
                self.spec.render.ffmpeg_path = val;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let data = &self.spec.exports.data;
        let thumbs = &self.spec.exports.thumbnails;
        for (label, export) in [("data", data), ("thumbnails", thumbs)] {
            if export.prefix.trim_matches('/').is_empty() {
                anyhow::bail!("spec.exports.{}.prefix cannot be empty", label);
            }
        }
        if data.prefix.trim_matches('/') == thumbs.prefix.trim_matches('/') {
            anyhow::bail!(
                "Data and thumbnail exports cannot share prefix '{}'",
                data.prefix
            );
        }

        let mut ports = HashSet::new();
        for port in [data.port, thumbs.port, self.spec.api.port] {
            if !ports.insert(port) {
                anyhow::bail!("Port {} is assigned to more than one listener", port);
            }
        }

        if self.spec.render.max_concurrent_renders == 0 {
            anyhow::bail!("spec.render.max_concurrent_renders must be at least 1");
        }

        let mut names = HashSet::new();
        for worker in &self.spec.workers {
            let name = worker.name.trim_start_matches('/');
            if name.is_empty() {
                anyhow::bail!("Worker name cannot be empty");
            }
            if name.contains('/') {
                anyhow::bail!("Worker name must be a single path segment: {}", worker.name);
            }
            if !names.insert(name.to_string()) {
                anyhow::bail!("Duplicate worker name: {}", name);
            }
        }

        Ok(())
    }
}
