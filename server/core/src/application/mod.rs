// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod app_service;
pub mod command_gateway;

pub use app_service::ApplicationService;
pub use command_gateway::{CommandGateway, CommandOutput, ExecutionError, GatewayError, RemoteExecutor};
