// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Application use cases.
//!
//! Each mutating operation validates its input, runs the Dokku command through
//! the [`CommandGateway`], and only then applies the matching transition to the
//! aggregate in one repository transaction. Events drained by that transaction
//! are published on the [`EventBus`], and the operation outcome is audited.
//!
//! A gateway error other than a failed remote command leaves the aggregate
//! untouched. A failed `git:sync` is recorded as a failed deployment.
//!
//! Mutating operations on one application run one at a time, from the
//! precondition check through the remote command to the commit, so the
//! aggregate sees transitions in the order the host applied them.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::application::command_gateway::{CommandGateway, GatewayError};
use crate::domain::application::{
    Application, ApplicationInfo, ApplicationListData, ApplicationState, ApplicationStatus,
    DeploymentOptions, FleetSummary,
};
use crate::domain::commands::DokkuCommand;
use crate::domain::error::DomainError;
use crate::domain::events::ApplicationEvent;
use crate::domain::policy::ClientContext;
use crate::domain::process::{validate_scale, ProcessType};
use crate::domain::repository::{ApplicationMutation, ApplicationRepository, RepositoryError};
use crate::domain::shared::{ApplicationName, BuildpackName, DomainName, EnvVarKey, GitRef};
use crate::infrastructure::audit::{AuditLogger, AuditRecord};
use crate::infrastructure::event_bus::EventBus;

pub struct ApplicationService {
    gateway: Arc<CommandGateway>,
    repository: Arc<dyn ApplicationRepository>,
    event_bus: EventBus,
    audit: Arc<dyn AuditLogger>,
    operations: DashMap<ApplicationName, Arc<Mutex<()>>>,
}

impl ApplicationService {
    pub fn new(
        gateway: Arc<CommandGateway>,
        repository: Arc<dyn ApplicationRepository>,
        event_bus: EventBus,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self { gateway, repository, event_bus, audit, operations: DashMap::new() }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub async fn create_application(
        &self,
        client: &ClientContext,
        name: &str,
    ) -> Result<ApplicationInfo, GatewayError> {
        self.audited(client, "create_application", name, async {
            let app = Application::create(name)?;
            let _guard = self.lock(app.name()).await;
            if self.repository.find_by_name(app.name()).await?.is_some() {
                return Err(DomainError::AlreadyExists(format!("application {}", app.name())).into());
            }

            let app_name = app.name().value().to_string();
            self.gateway
                .execute(client, DokkuCommand::AppsCreate.as_str(), &[app_name])
                .await?;

            let info = ApplicationInfo::from(&app);
            let events = self.repository.insert(app).await?;
            self.publish(events);
            Ok(info)
        })
        .await
    }

    /// Register applications that exist on the host but not in memory.
    ///
    /// Returns the names that were added, in host order.
    pub async fn import_applications(&self, client: &ClientContext) -> Result<Vec<String>, GatewayError> {
        self.audited(client, "import_applications", "-", async {
            let output = self.gateway.execute(client, DokkuCommand::AppsList.as_str(), &[]).await?;

            let mut imported = Vec::new();
            for line in output.stdout.lines().map(str::trim) {
                if line.is_empty() || line.starts_with("=====>") {
                    continue;
                }
                let app = match Application::create_with_state(line, ApplicationState::Exists) {
                    Ok(app) => app,
                    Err(e) => {
                        warn!(line, error = %e, "skipping unparseable apps:list entry");
                        continue;
                    }
                };
                let _guard = self.lock(app.name()).await;
                if self.repository.find_by_name(app.name()).await?.is_some() {
                    continue;
                }
                let name = app.name().value().to_string();
                match self.repository.insert(app).await {
                    Ok(events) => {
                        self.publish(events);
                        imported.push(name);
                    }
                    // Lost a race with a concurrent create.
                    Err(RepositoryError::AlreadyExists(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            info!(count = imported.len(), "imported applications from host");
            Ok(imported)
        })
        .await
    }

    /// Sync `repository` at `git_ref` onto the host and build it.
    pub async fn deploy(
        &self,
        client: &ClientContext,
        name: &str,
        repository: &str,
        git_ref: &str,
        options: Option<DeploymentOptions>,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "deploy", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let git_ref = GitRef::new(git_ref)?;
            if repository.trim().is_empty() {
                return Err(DomainError::validation("repository is required").into());
            }

            let args = vec![
                "--build".to_string(),
                app_name.value().to_string(),
                repository.to_string(),
                git_ref.value().to_string(),
            ];
            // Only a command the host ran and rejected is a failed deployment.
            let failure = match self.gateway.execute(client, DokkuCommand::GitSync.as_str(), &args).await {
                Ok(_) => None,
                Err(e) if e.is_remote_failure() => Some(e),
                Err(e) => return Err(e),
            };
            let reason = failure.as_ref().map(GatewayError::client_message);

            let mutation: ApplicationMutation = Box::new(move |app: &mut Application| {
                app.deploy(Some(git_ref), options.as_ref())?;
                match reason {
                    None => app.complete_deployment(),
                    Some(reason) => app.fail_deployment(&reason),
                }
                Ok(())
            });
            let status = self.transact(&app_name, mutation).await?;
            match failure {
                None => Ok(status),
                Some(e) => Err(e),
            }
        })
        .await
    }

    pub async fn scale(
        &self,
        client: &ClientContext,
        name: &str,
        process_type: &str,
        instances: i64,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "scale", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let process_type = ProcessType::new(process_type)?;
            let scale = validate_scale(instances)?;

            let args = vec![
                app_name.value().to_string(),
                format!("{}={}", process_type.value(), scale),
            ];
            self.gateway.execute(client, DokkuCommand::PsScale.as_str(), &args).await?;

            let mutation: ApplicationMutation =
                Box::new(move |app: &mut Application| app.scale(process_type, instances));
            self.transact(&app_name, mutation).await
        })
        .await
    }

    pub async fn add_domain(
        &self,
        client: &ClientContext,
        name: &str,
        domain: &str,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "add_domain", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let domain = DomainName::new(domain)?;
            if self.snapshot(&app_name).await?.has_domain(domain.value()) {
                return Err(DomainError::AlreadyExists(format!("domain {}", domain)).into());
            }

            let args = vec![app_name.value().to_string(), domain.value().to_string()];
            self.gateway.execute(client, DokkuCommand::DomainsAdd.as_str(), &args).await?;

            let mutation: ApplicationMutation =
                Box::new(move |app: &mut Application| app.add_domain(domain.value()));
            self.transact(&app_name, mutation).await
        })
        .await
    }

    pub async fn remove_domain(
        &self,
        client: &ClientContext,
        name: &str,
        domain: &str,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "remove_domain", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let domain = DomainName::new(domain)?;
            if !self.snapshot(&app_name).await?.has_domain(domain.value()) {
                return Err(DomainError::NotFound(format!("domain {}", domain)).into());
            }

            let args = vec![app_name.value().to_string(), domain.value().to_string()];
            self.gateway.execute(client, DokkuCommand::DomainsRemove.as_str(), &args).await?;

            let mutation: ApplicationMutation =
                Box::new(move |app: &mut Application| app.remove_domain(domain.value()));
            self.transact(&app_name, mutation).await
        })
        .await
    }

    pub async fn set_buildpack(
        &self,
        client: &ClientContext,
        name: &str,
        buildpack: &str,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "set_buildpack", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let buildpack = BuildpackName::new(buildpack)?;

            let args = vec![app_name.value().to_string(), buildpack.value().to_string()];
            self.gateway.execute(client, DokkuCommand::BuildpacksSet.as_str(), &args).await?;

            let mutation: ApplicationMutation =
                Box::new(move |app: &mut Application| app.set_buildpack(buildpack.value()));
            self.transact(&app_name, mutation).await
        })
        .await
    }

    /// Set one environment variable. Dokku restarts the app unless told otherwise.
    pub async fn set_environment_variable(
        &self,
        client: &ClientContext,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<ApplicationStatus, GatewayError> {
        self.audited(client, "set_environment_variable", name, async {
            let (app_name, _guard) = self.begin(name).await?;
            let key = EnvVarKey::new(key)?;

            let args = vec![app_name.value().to_string(), format!("{}={}", key.value(), value)];
            self.gateway.execute(client, DokkuCommand::ConfigSet.as_str(), &args).await?;

            let value = value.to_string();
            let mutation: ApplicationMutation = Box::new(move |app: &mut Application| {
                app.set_environment_variable(key.value(), &value)
            });
            self.transact(&app_name, mutation).await
        })
        .await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn application_status(&self, name: &str) -> Result<ApplicationStatus, GatewayError> {
        let app_name = ApplicationName::new(name)?;
        let app = self.snapshot(&app_name).await?;
        Ok(ApplicationStatus::from(&app))
    }

    pub async fn list_applications(&self) -> Result<ApplicationListData, GatewayError> {
        let apps = self.repository.list_all().await?;
        Ok(ApplicationListData::from_applications(&apps))
    }

    pub async fn fleet_summary(&self) -> Result<FleetSummary, GatewayError> {
        let apps = self.repository.list_all().await?;
        Ok(FleetSummary::from_applications(&apps))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Take the operation lock for `name`, then check the application exists.
    async fn begin(&self, name: &str) -> Result<(ApplicationName, OwnedMutexGuard<()>), GatewayError> {
        let app_name = ApplicationName::new(name)?;
        let guard = self.lock(&app_name).await;
        self.snapshot(&app_name).await?;
        Ok((app_name, guard))
    }

    async fn lock(&self, name: &ApplicationName) -> OwnedMutexGuard<()> {
        // Clone the slot out so no map shard stays locked across the await.
        let slot = self.operations.entry(name.clone()).or_default().clone();
        slot.lock_owned().await
    }

    async fn snapshot(&self, name: &ApplicationName) -> Result<Application, GatewayError> {
        self.repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("application {}", name)).into())
    }

    async fn transact(
        &self,
        name: &ApplicationName,
        mutation: ApplicationMutation,
    ) -> Result<ApplicationStatus, GatewayError> {
        let events = self.repository.update(name, mutation).await?;
        self.publish(events);
        let app = self.snapshot(name).await?;
        Ok(ApplicationStatus::from(&app))
    }

    fn publish(&self, events: Vec<ApplicationEvent>) {
        self.event_bus.publish_all(events);
    }

    async fn audited<T, F>(
        &self,
        client: &ClientContext,
        operation: &str,
        resource: &str,
        work: F,
    ) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let started = Instant::now();
        let result = work.await;
        let record = match &result {
            Ok(_) => AuditRecord::success(&client.client_id, operation, resource, started.elapsed()),
            Err(e) => AuditRecord::failure(
                &client.client_id,
                operation,
                resource,
                e.to_string(),
                started.elapsed(),
            ),
        };
        self.audit.record(record).await;
        result
    }
}
