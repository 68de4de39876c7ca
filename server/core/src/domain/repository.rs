// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interface
//!
//! Persistence contract for the [`Application`] aggregate. The only
//! implementation today is
//! [`crate::infrastructure::repositories::InMemoryApplicationRepository`];
//! state does not outlive the process.
//!
//! Every mutation goes through [`ApplicationRepository::update`], which is
//! responsible for serializing writers per application name and for applying
//! the mutation all-or-nothing.

use async_trait::async_trait;

use crate::domain::application::Application;
use crate::domain::error::DomainError;
use crate::domain::events::ApplicationEvent;
use crate::domain::shared::ApplicationName;

/// A single aggregate transaction.
pub type ApplicationMutation =
    Box<dyn FnOnce(&mut Application) -> Result<(), DomainError> + Send + 'static>;

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Store a new aggregate and return the events it had pending.
    async fn insert(&self, app: Application) -> Result<Vec<ApplicationEvent>, RepositoryError>;

    /// Snapshot of the aggregate, if present.
    async fn find_by_name(&self, name: &ApplicationName) -> Result<Option<Application>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Application>, RepositoryError>;

    /// Apply `mutation` and commit it only if it succeeds.
    ///
    /// Returns the events drained from the aggregate during this transaction.
    async fn update(
        &self,
        name: &ApplicationName,
        mutation: ApplicationMutation,
    ) -> Result<Vec<ApplicationEvent>, RepositoryError>;

    /// Forget the in-memory copy after the host deleted the application.
    async fn delete(&self, name: &ApplicationName) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Application not found: {0}")]
    NotFound(String),

    #[error("Application already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
