// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Dokku MCP CLI

pub mod auth;
pub mod config;
pub mod policy;

pub use self::auth::AuthCommand;
pub use self::config::ConfigCommand;
pub use self::policy::PolicyCommand;
