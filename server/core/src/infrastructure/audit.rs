// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Logging
//!
//! One [`AuditRecord`] is written after every policy decision and after every
//! aggregate mutation. The gateway only writes records; it never reads them
//! back.
//!
//! [`TracingAuditLogger`] sends records to the structured log: successes at
//! `INFO`, failures at `WARN`, both under the `audit` target so a subscriber
//! can route them separately. [`InMemoryAuditLogger`] keeps them for tests
//! and the CLI.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub client_id: String,
    /// Dokku command or service operation, e.g. `ps:scale`
    pub operation: String,
    /// Application the operation targeted, or `-` for host-wide commands
    pub resource: String,
    pub success: bool,
    pub error: Option<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl AuditRecord {
    pub fn success(
        client_id: impl Into<String>,
        operation: impl Into<String>,
        resource: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self::build(client_id, operation, resource, None, duration)
    }

    pub fn failure(
        client_id: impl Into<String>,
        operation: impl Into<String>,
        resource: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self::build(client_id, operation, resource, Some(error.into()), duration)
    }

    fn build(
        client_id: impl Into<String>,
        operation: impl Into<String>,
        resource: impl Into<String>,
        error: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            client_id: client_id.into(),
            operation: operation.into(),
            resource: resource.into(),
            success: error.is_none(),
            error,
            duration,
        }
    }
}

#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

#[derive(Debug, Default)]
pub struct TracingAuditLogger;

impl TracingAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn record(&self, record: AuditRecord) {
        let duration_ms = record.duration.as_millis() as u64;
        match &record.error {
            None => info!(
                target: "audit",
                audit_id = %record.id,
                client_id = %record.client_id,
                operation = %record.operation,
                resource = %record.resource,
                duration_ms,
                "operation succeeded"
            ),
            Some(error) => warn!(
                target: "audit",
                audit_id = %record.id,
                client_id = %record.client_id,
                operation = %record.operation,
                resource = %record.resource,
                duration_ms,
                error = %error,
                "operation failed"
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}
