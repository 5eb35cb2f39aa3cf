// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and seams shared by every layer: the filesystem capability
//! contract, workers and their registry, path rules and render taxonomy.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Core types and contracts of the federated namespace

pub mod fs;
pub mod virtual_entry;
pub mod path_sanitizer;
pub mod worker;
pub mod registry;
pub mod thumbnail;
pub mod render;
pub mod node_config;
