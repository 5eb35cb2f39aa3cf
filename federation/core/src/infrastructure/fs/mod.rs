// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Filesystem adapters: per-worker disk and thumbnail views, and the root router.

pub mod disk;
pub mod disk_file;
pub mod router;
pub mod thumbnail;

pub use disk::DiskFileSystem;
pub use disk_file::DiskFile;
pub use router::{normalize_prefix, RootRouter, RouterKind};
pub use thumbnail::ThumbnailFileSystem;
