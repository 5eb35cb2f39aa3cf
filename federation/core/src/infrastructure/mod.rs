// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod fs;
pub mod nfs;
pub mod render;
pub mod runtime_check;
