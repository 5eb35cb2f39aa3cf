// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Startup probe for external tools used by the render generators.

use serde::Serialize;
use std::path::PathBuf;

use crate::domain::node_config::RenderConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub tool: String,
    /// Resolved executable, `None` when not found
    pub path: Option<PathBuf>,
    /// What stops working without it
    pub required_for: &'static str,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }
}

/// Resolve every external tool named in the render configuration
pub fn check_external_tools(render: &RenderConfig) -> Vec<ToolStatus> {
    vec![ToolStatus {
        tool: render.ffmpeg_path.clone(),
        path: which::which(&render.ffmpeg_path).ok(),
        required_for: "video thumbnails",
    }]
}

/// Log the probe; a missing tool only disables its format family
pub fn report(statuses: &[ToolStatus]) {
    for status in statuses {
        match &status.path {
            Some(path) => tracing::info!(
                tool = %status.tool,
                path = %path.display(),
                "External tool found"
            ),
            None => tracing::warn!(
                tool = %status.tool,
                "External tool not found on PATH, {} are disabled",
                status.required_for
            ),
        }
    }
}
