// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod render_dispatcher;
pub mod federation;
pub mod nfs_gateway;

pub use federation::FederationService;
pub use nfs_gateway::{NfsGatewayError, NfsGatewayService};
pub use render_dispatcher::{GeneratorRegistry, RenderDispatcher};
