// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! nasfed core
//!
//! Presents an arbitrary, changing set of independently mounted directory trees
//! as one namespace to remote file-access clients, and serves on-demand cached
//! thumbnails of the same trees through a second, read-only namespace.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Virtual filesystem federation and thumbnail render cache

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
