// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! Dokku MCP core
//!
//! Domain model and trust boundary for the Dokku MCP server.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Application aggregate, command authorization, credential
//!   resolution and the services wiring them together
//!
//! The MCP protocol adapter, transports and the SSH session transport live
//! outside this crate and plug in through
//! [`application::command_gateway::RemoteExecutor`] and the repository /
//! audit traits.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
