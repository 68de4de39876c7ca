// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Hold application aggregates for the lifetime of the process
//! - **Pattern:** Repository (DDD)
//!
//! Each application sits behind its own `tokio::sync::Mutex`, so writers of
//! one application queue up while other applications stay independent. An
//! update works on a clone and swaps it in only when the mutation succeeds;
//! a dropped future never reaches the swap.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::application::Application;
use crate::domain::events::ApplicationEvent;
use crate::domain::repository::{ApplicationMutation, ApplicationRepository, RepositoryError};
use crate::domain::shared::ApplicationName;

#[derive(Clone, Default)]
pub struct InMemoryApplicationRepository {
    apps: Arc<DashMap<ApplicationName, Arc<Mutex<Application>>>>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &ApplicationName) -> Result<Arc<Mutex<Application>>, RepositoryError> {
        // Clone the Arc so the shard lock is released before awaiting the app lock.
        self.apps
            .get(name)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(&self, mut app: Application) -> Result<Vec<ApplicationEvent>, RepositoryError> {
        match self.apps.entry(app.name().clone()) {
            Entry::Occupied(entry) => Err(RepositoryError::AlreadyExists(entry.key().to_string())),
            Entry::Vacant(entry) => {
                let events = app.drain_events();
                entry.insert(Arc::new(Mutex::new(app)));
                Ok(events)
            }
        }
    }

    async fn find_by_name(&self, name: &ApplicationName) -> Result<Option<Application>, RepositoryError> {
        let slot = match self.slot(name) {
            Ok(slot) => slot,
            Err(RepositoryError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let guard = slot.lock().await;
        Ok(Some(guard.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        let slots: Vec<_> = self.apps.iter().map(|slot| Arc::clone(slot.value())).collect();
        let mut apps = Vec::with_capacity(slots.len());
        for slot in slots {
            apps.push(slot.lock().await.clone());
        }
        apps.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(apps)
    }

    async fn update(
        &self,
        name: &ApplicationName,
        mutation: ApplicationMutation,
    ) -> Result<Vec<ApplicationEvent>, RepositoryError> {
        let slot = self.slot(name)?;
        let mut guard = slot.lock().await;

        let mut working = guard.clone();
        mutation(&mut working)?;
        let events = working.drain_events();
        *guard = working;

        Ok(events)
    }

    async fn delete(&self, name: &ApplicationName) -> Result<(), RepositoryError> {
        self.apps
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }
}
