// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facts emitted by the [`crate::domain::application::Application`] aggregate.
///
/// Serialized with an internal `event_type` tag so external consumers receive
/// `{"event_type": ..., "aggregate_id": ..., "occurred_at": ..., <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ApplicationEvent {
    ApplicationCreated {
        aggregate_id: String,
        occurred_at: DateTime<Utc>,
    },
    ApplicationDeployed {
        aggregate_id: String,
        git_ref: String,
        occurred_at: DateTime<Utc>,
    },
    ApplicationDeploymentFailed {
        aggregate_id: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    ApplicationScaled {
        aggregate_id: String,
        process_type: String,
        old_scale: u32,
        new_scale: u32,
        occurred_at: DateTime<Utc>,
    },
    DomainAdded {
        aggregate_id: String,
        domain: String,
        occurred_at: DateTime<Utc>,
    },
    DomainRemoved {
        aggregate_id: String,
        domain: String,
        occurred_at: DateTime<Utc>,
    },
    BuildpackChanged {
        aggregate_id: String,
        buildpack: String,
        occurred_at: DateTime<Utc>,
    },
}

impl ApplicationEvent {
    pub fn aggregate_id(&self) -> &str {
        match self {
            Self::ApplicationCreated { aggregate_id, .. }
            | Self::ApplicationDeployed { aggregate_id, .. }
            | Self::ApplicationDeploymentFailed { aggregate_id, .. }
            | Self::ApplicationScaled { aggregate_id, .. }
            | Self::DomainAdded { aggregate_id, .. }
            | Self::DomainRemoved { aggregate_id, .. }
            | Self::BuildpackChanged { aggregate_id, .. } => aggregate_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ApplicationCreated { occurred_at, .. }
            | Self::ApplicationDeployed { occurred_at, .. }
            | Self::ApplicationDeploymentFailed { occurred_at, .. }
            | Self::ApplicationScaled { occurred_at, .. }
            | Self::DomainAdded { occurred_at, .. }
            | Self::DomainRemoved { occurred_at, .. }
            | Self::BuildpackChanged { occurred_at, .. } => *occurred_at,
        }
    }

    /// Wire name, identical to the serialized `event_type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ApplicationCreated { .. } => "application_created",
            Self::ApplicationDeployed { .. } => "application_deployed",
            Self::ApplicationDeploymentFailed { .. } => "application_deployment_failed",
            Self::ApplicationScaled { .. } => "application_scaled",
            Self::DomainAdded { .. } => "domain_added",
            Self::DomainRemoved { .. } => "domain_removed",
            Self::BuildpackChanged { .. } => "buildpack_changed",
        }
    }
}
