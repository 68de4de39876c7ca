// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use dokku_mcp_core::application::command_gateway::{
    CommandGateway, CommandOutput, ExecutionError, RemoteExecutor,
};
use dokku_mcp_core::application::ApplicationService;
use dokku_mcp_core::domain::config::SecurityConfig;
use dokku_mcp_core::infrastructure::audit::InMemoryAuditLogger;
use dokku_mcp_core::infrastructure::event_bus::EventBus;
use dokku_mcp_core::infrastructure::policy_store::PolicyStore;
use dokku_mcp_core::infrastructure::rate_limiter::RateLimiter;
use dokku_mcp_core::infrastructure::repositories::InMemoryApplicationRepository;
use dokku_mcp_core::infrastructure::ssh_auth::{
    ConnectionAuthenticator, Credential, CredentialStrategy, StrategyTag,
};

/// Executor that records every call and replays scripted responses.
#[derive(Default)]
pub struct ScriptedExecutor {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    responses: Mutex<HashMap<String, Vec<Result<CommandOutput, ExecutionError>>>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for the next call of `command`. Unscripted calls succeed.
    pub fn respond(&self, command: &str, response: Result<CommandOutput, ExecutionError>) {
        self.responses.lock().entry(command.to_string()).or_default().push(response);
    }

    pub fn fail(&self, command: &str, exit_code: i32, stderr: &str) {
        self.respond(
            command,
            Ok(CommandOutput { stdout: String::new(), stderr: stderr.to_string(), exit_code }),
        );
    }

    pub fn delay_all(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(command, _)| command.clone()).collect()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _credential: &Credential,
        command: &str,
        args: &[String],
    ) -> Result<CommandOutput, ExecutionError> {
        self.calls.lock().push((command.to_string(), args.to_vec()));
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = {
            let mut responses = self.responses.lock();
            responses.get_mut(command).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            })
        };
        scripted.unwrap_or_else(|| Ok(CommandOutput::success("")))
    }
}

/// Always yields the same key file and counts how often it was asked.
pub struct StaticKeyStrategy {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CredentialStrategy for StaticKeyStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::ConfiguredKeyFile
    }

    async fn attempt(&self) -> Result<Credential, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::KeyFile { path: PathBuf::from("/keys/dokku") })
    }
}

pub struct Harness {
    pub service: ApplicationService,
    pub gateway: Arc<CommandGateway>,
    pub executor: Arc<ScriptedExecutor>,
    pub audit: Arc<InMemoryAuditLogger>,
    pub events: EventBus,
    pub credential_lookups: Arc<AtomicUsize>,
}

/// Security settings without the default `remove` pattern, so domain removal
/// can be exercised.
pub fn permissive_security() -> SecurityConfig {
    SecurityConfig {
        blacklist: vec!["destroy".to_string(), "uninstall".to_string()],
        ..SecurityConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(permissive_security(), RateLimiter::new(1000, Duration::from_secs(60), Duration::from_secs(60)))
}

pub fn harness_with(security: SecurityConfig, rate_limiter: RateLimiter) -> Harness {
    harness_full(security, rate_limiter, Duration::from_secs(5))
}

pub fn harness_full(
    security: SecurityConfig,
    rate_limiter: RateLimiter,
    command_timeout: Duration,
) -> Harness {
    let executor = ScriptedExecutor::new();
    let audit = Arc::new(InMemoryAuditLogger::new());
    let events = EventBus::new(64);
    let credential_lookups = Arc::new(AtomicUsize::new(0));

    let authenticator = ConnectionAuthenticator::new(
        vec![Box::new(StaticKeyStrategy { calls: Arc::clone(&credential_lookups) })],
        Duration::from_secs(1),
    );
    let gateway = Arc::new(CommandGateway::new(
        rate_limiter,
        Arc::new(PolicyStore::new(&security)),
        Arc::new(authenticator),
        executor.clone(),
        audit.clone(),
        command_timeout,
    ));
    let service = ApplicationService::new(
        Arc::clone(&gateway),
        Arc::new(InMemoryApplicationRepository::new()),
        events.clone(),
        audit.clone(),
    );

    Harness { service, gateway, executor, audit, events, credential_lookups }
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
