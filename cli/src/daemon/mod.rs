// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon mode implementation
//!
//! Handles:
//! - Composition of the federation, NFS exports and admin API
//! - Graceful shutdown
//! - The HTTP client used by the worker commands

pub mod client;
pub mod server;

pub use client::DaemonClient;
pub use server::start_daemon;
