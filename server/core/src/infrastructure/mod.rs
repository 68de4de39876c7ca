// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod audit;
pub mod event_bus;
pub mod policy_store;
pub mod rate_limiter;
pub mod repositories;
pub mod ssh_auth;

pub use audit::{AuditLogger, AuditRecord, InMemoryAuditLogger, TracingAuditLogger};
pub use event_bus::EventBus;
pub use policy_store::PolicyStore;
pub use rate_limiter::RateLimiter;
pub use repositories::InMemoryApplicationRepository;
pub use ssh_auth::{ConnectionAuthenticator, Credential};
