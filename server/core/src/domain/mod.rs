// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Aggregates, value objects, events and pure policy decisions

pub mod application;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod process;
pub mod repository;
pub mod shared;
