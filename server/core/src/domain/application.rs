// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Application Aggregate
//!
//! In-memory model of a Dokku application: lifecycle state, configuration,
//! deployment history and the events produced since the last drain.
//!
//! ## Invariants
//!
//! - Domain names are unique per application (exact value equality).
//! - Process scale is never negative.
//! - `updated_at` never moves backwards and is bumped by every mutation.
//! - Pending events are only removed by [`Application::drain_events`].
//!
//! The aggregate is not synchronized. Callers serialize mutations per
//! application name; see
//! [`crate::infrastructure::repositories::InMemoryApplicationRepository`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::events::ApplicationEvent;
use crate::domain::process::{validate_scale, Process, ProcessType};
use crate::domain::shared::{
    ApplicationName, BuildpackName, DockerImage, DomainName, EnvVarKey, EnvVarValue, GitRef,
};

// ============================================================================
// Value Objects
// ============================================================================

/// Lifecycle state of an application as observed on the Dokku host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationState {
    /// The application exists but has never been deployed.
    Exists,
    Running,
    Error,
}

impl ApplicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Running => "running",
            Self::Error => "error",
        }
    }

    /// Deployed at least once, whether or not it is currently healthy.
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Running | Self::Error)
    }
}

impl FromStr for ApplicationState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exists" => Ok(Self::Exists),
            "running" => Ok(Self::Running),
            "error" => Ok(Self::Error),
            other => Err(DomainError::Validation(format!(
                "unknown application state '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration snapshot of an application.
///
/// Returned by [`Application::configuration`] as a copy. Processes are shared
/// with the aggregate through `Arc`; the aggregate copies on write, so holders
/// of a snapshot never observe later changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationConfiguration {
    buildpack: Option<BuildpackName>,
    domains: Vec<DomainName>,
    environment_vars: BTreeMap<EnvVarKey, EnvVarValue>,
    processes: HashMap<ProcessType, Arc<Process>>,
}

impl ApplicationConfiguration {
    pub fn buildpack(&self) -> Option<&BuildpackName> {
        self.buildpack.as_ref()
    }

    pub fn domains(&self) -> &[DomainName] {
        &self.domains
    }

    pub fn environment_vars(&self) -> &BTreeMap<EnvVarKey, EnvVarValue> {
        &self.environment_vars
    }

    pub fn processes(&self) -> &HashMap<ProcessType, Arc<Process>> {
        &self.processes
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentInfo {
    current_git_ref: Option<GitRef>,
    last_deployed_at: Option<DateTime<Utc>>,
    build_image: Option<DockerImage>,
    run_image: Option<DockerImage>,
    deployment_count: u32,
}

impl DeploymentInfo {
    pub fn current_git_ref(&self) -> Option<&GitRef> {
        self.current_git_ref.as_ref()
    }

    pub fn last_deployed_at(&self) -> Option<DateTime<Utc>> {
        self.last_deployed_at
    }

    pub fn build_image(&self) -> Option<&DockerImage> {
        self.build_image.as_ref()
    }

    pub fn run_image(&self) -> Option<&DockerImage> {
        self.run_image.as_ref()
    }

    pub fn deployment_count(&self) -> u32 {
        self.deployment_count
    }
}

/// Per-deploy options. Only the image references are kept on the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_image: Option<DockerImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_image: Option<DockerImage>,
    #[serde(default)]
    pub force_clean: bool,
    #[serde(default)]
    pub no_cache: bool,
}

// ============================================================================
// Aggregate Root: Application
// ============================================================================

#[derive(Debug, Clone)]
pub struct Application {
    name: ApplicationName,
    state: ApplicationState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    configuration: ApplicationConfiguration,
    deployment_info: DeploymentInfo,
    events: Vec<ApplicationEvent>,
}

impl Application {
    /// Create a new application in the `Exists` state.
    pub fn create(name: &str) -> Result<Self, DomainError> {
        Self::create_with_state(name, ApplicationState::Exists)
    }

    /// Create an application reflecting state observed on the host.
    ///
    /// Used by repositories rebuilding aggregates from `apps:report` output.
    pub fn create_with_state(name: &str, state: ApplicationState) -> Result<Self, DomainError> {
        let name = ApplicationName::new(name)?;
        let now = Utc::now();

        let mut app = Self {
            name,
            state,
            created_at: now,
            updated_at: now,
            configuration: ApplicationConfiguration::default(),
            deployment_info: DeploymentInfo::default(),
            events: Vec::new(),
        };
        app.record(ApplicationEvent::ApplicationCreated {
            aggregate_id: app.name.value().to_string(),
            occurred_at: now,
        });
        Ok(app)
    }

    pub fn name(&self) -> &ApplicationName {
        &self.name
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn configuration(&self) -> ApplicationConfiguration {
        self.configuration.clone()
    }

    pub fn deployment_info(&self) -> &DeploymentInfo {
        &self.deployment_info
    }

    // ========================================================================
    // Aggregate Commands (State Mutations)
    // ========================================================================

    /// Record a deployment of `git_ref`. Does not change the state; the outcome
    /// is reported through [`Self::complete_deployment`] or [`Self::fail_deployment`].
    pub fn deploy(
        &mut self,
        git_ref: Option<GitRef>,
        options: Option<&DeploymentOptions>,
    ) -> Result<(), DomainError> {
        let git_ref = git_ref.ok_or_else(|| DomainError::validation("git reference is required"))?;
        let now = Utc::now();

        let aggregate_id = self.name.value().to_string();
        let event_ref = git_ref.value().to_string();

        self.deployment_info.current_git_ref = Some(git_ref);
        self.deployment_info.last_deployed_at = Some(now);
        self.deployment_info.deployment_count += 1;
        if let Some(options) = options {
            self.deployment_info.build_image = options.build_image.clone();
            self.deployment_info.run_image = options.run_image.clone();
        }

        self.touch(now);
        self.record(ApplicationEvent::ApplicationDeployed {
            aggregate_id,
            git_ref: event_ref,
            occurred_at: now,
        });
        Ok(())
    }

    /// Mark the application as running. Allowed from any state.
    pub fn complete_deployment(&mut self) {
        self.set_state(ApplicationState::Running);
    }

    /// Record a failed deployment, then move to `Error`.
    pub fn fail_deployment(&mut self, reason: &str) {
        self.record(ApplicationEvent::ApplicationDeploymentFailed {
            aggregate_id: self.name.value().to_string(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        });
        self.set_state(ApplicationState::Error);
    }

    /// Scale `process_type` to `instances`.
    ///
    /// An unknown process type is declared on the fly and reported as scaled
    /// from 0. A `Scaled` event is emitted even when the scale is unchanged.
    pub fn scale(&mut self, process_type: ProcessType, instances: i64) -> Result<(), DomainError> {
        let new_scale = validate_scale(instances)?;
        let old_scale = match self.configuration.processes.get_mut(&process_type) {
            Some(process) => {
                let old = process.scale();
                Arc::make_mut(process).set_scale(instances)?;
                old
            }
            None => {
                let process = Process::for_scaling(process_type.clone(), instances)?;
                self.configuration.processes.insert(process_type.clone(), Arc::new(process));
                0
            }
        };

        let now = Utc::now();
        self.touch(now);
        self.record(ApplicationEvent::ApplicationScaled {
            aggregate_id: self.name.value().to_string(),
            process_type: process_type.value().to_string(),
            old_scale,
            new_scale,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn add_domain(&mut self, domain: &str) -> Result<(), DomainError> {
        let domain = DomainName::new(domain)?;
        if self.configuration.domains.contains(&domain) {
            return Err(DomainError::AlreadyExists(format!(
                "domain {} is already attached to {}",
                domain, self.name
            )));
        }

        let now = Utc::now();
        let event_domain = domain.value().to_string();
        self.configuration.domains.push(domain);
        self.touch(now);
        self.record(ApplicationEvent::DomainAdded {
            aggregate_id: self.name.value().to_string(),
            domain: event_domain,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn remove_domain(&mut self, domain: &str) -> Result<(), DomainError> {
        let domain = DomainName::new(domain)?;
        let position = self
            .configuration
            .domains
            .iter()
            .position(|existing| existing == &domain)
            .ok_or_else(|| {
                DomainError::NotFound(format!("domain {} is not attached to {}", domain, self.name))
            })?;

        let now = Utc::now();
        self.configuration.domains.remove(position);
        self.touch(now);
        self.record(ApplicationEvent::DomainRemoved {
            aggregate_id: self.name.value().to_string(),
            domain: domain.value().to_string(),
            occurred_at: now,
        });
        Ok(())
    }

    pub fn set_buildpack(&mut self, buildpack: &str) -> Result<(), DomainError> {
        let buildpack = BuildpackName::new(buildpack)?;
        let now = Utc::now();
        let event_buildpack = buildpack.value().to_string();

        self.configuration.buildpack = Some(buildpack);
        self.touch(now);
        self.record(ApplicationEvent::BuildpackChanged {
            aggregate_id: self.name.value().to_string(),
            buildpack: event_buildpack,
            occurred_at: now,
        });
        Ok(())
    }

    /// Set an environment variable. No event is emitted.
    pub fn set_environment_variable(&mut self, key: &str, value: &str) -> Result<(), DomainError> {
        let key = EnvVarKey::new(key)?;
        self.configuration.environment_vars.insert(key, EnvVarValue::new(value));
        self.touch(Utc::now());
        Ok(())
    }

    /// Declare (or replace) a process with an explicit command. No event is emitted.
    pub fn add_process(
        &mut self,
        process_type: ProcessType,
        command: &str,
        scale: i64,
    ) -> Result<(), DomainError> {
        let process = Process::new(process_type.clone(), command, scale)?;
        self.configuration.processes.insert(process_type, Arc::new(process));
        self.touch(Utc::now());
        Ok(())
    }

    /// Declare (or replace) a process whose command comes from the Procfile.
    pub fn add_process_for_scaling(
        &mut self,
        process_type: ProcessType,
        scale: i64,
    ) -> Result<(), DomainError> {
        let process = Process::for_scaling(process_type.clone(), scale)?;
        self.configuration.processes.insert(process_type, Arc::new(process));
        self.touch(Utc::now());
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.state == ApplicationState::Running
    }

    pub fn is_deployed(&self) -> bool {
        self.state.is_deployed()
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        match DomainName::new(domain) {
            Ok(domain) => self.configuration.domains.contains(&domain),
            Err(_) => false,
        }
    }

    /// Current scale of `process_type`, 0 when the process is not declared.
    pub fn process_scale(&self, process_type: &ProcessType) -> u32 {
        self.configuration
            .processes
            .get(process_type)
            .map(|process| process.scale())
            .unwrap_or(0)
    }

    pub fn domains(&self) -> Vec<String> {
        self.configuration.domains.iter().map(|d| d.value().to_string()).collect()
    }

    /// Events recorded since the last drain, oldest first.
    pub fn pending_events(&self) -> &[ApplicationEvent] {
        &self.events
    }

    /// Take the pending events, leaving the buffer empty.
    ///
    /// Call once per externally visible transaction; a second call returns
    /// nothing.
    pub fn drain_events(&mut self) -> Vec<ApplicationEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Private
    // ========================================================================

    fn set_state(&mut self, state: ApplicationState) {
        self.state = state;
        self.touch(Utc::now());
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    fn record(&mut self, event: ApplicationEvent) {
        self.events.push(event);
    }
}

// ============================================================================
// Read Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub name: String,
    pub state: ApplicationState,
    pub is_running: bool,
    pub is_deployed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Application> for ApplicationInfo {
    fn from(app: &Application) -> Self {
        Self {
            name: app.name.value().to_string(),
            state: app.state,
            is_running: app.is_running(),
            is_deployed: app.is_deployed(),
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// Per-application summary served to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    pub name: String,
    pub state: ApplicationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_running: bool,
    pub is_deployed: bool,
    pub domains: Vec<String>,
}

impl From<&Application> for ApplicationStatus {
    fn from(app: &Application) -> Self {
        Self {
            name: app.name.value().to_string(),
            state: app.state,
            created_at: app.created_at,
            updated_at: app.updated_at,
            is_running: app.is_running(),
            is_deployed: app.is_deployed(),
            domains: app.domains(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationListData {
    pub applications: Vec<ApplicationInfo>,
    pub count: usize,
}

impl ApplicationListData {
    pub fn from_applications<'a>(apps: impl IntoIterator<Item = &'a Application>) -> Self {
        let applications: Vec<ApplicationInfo> = apps.into_iter().map(ApplicationInfo::from).collect();
        let count = applications.len();
        Self { applications, count }
    }
}

/// Fleet-wide counts. `stopped_apps` counts every application not running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total_apps: usize,
    pub running_apps: usize,
    pub stopped_apps: usize,
    pub deployed_apps: usize,
}

impl FleetSummary {
    pub fn from_applications<'a>(apps: impl IntoIterator<Item = &'a Application>) -> Self {
        apps.into_iter().fold(Self::default(), |mut summary, app| {
            summary.total_apps += 1;
            if app.is_running() {
                summary.running_apps += 1;
            } else {
                summary.stopped_apps += 1;
            }
            if app.is_deployed() {
                summary.deployed_apps += 1;
            }
            summary
        })
    }
}
