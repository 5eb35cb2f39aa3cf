// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod worker;

pub use config::ConfigCommand;
pub use worker::WorkerCommand;
