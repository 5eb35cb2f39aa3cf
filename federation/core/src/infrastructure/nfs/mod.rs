// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod file_handle;
pub mod server;

pub use file_handle::FileIdTable;
pub use server::{FederationNfsAdapter, NfsExport, NfsServer, NfsServerError};
