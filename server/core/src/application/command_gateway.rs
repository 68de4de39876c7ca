// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Command Gateway
//!
//! Trust boundary between MCP clients and the Dokku host. Every remote
//! command passes through, in order:
//!
//! 1. [`RateLimiter`] rejects clients over budget
//! 2. [`PolicyStore`] evaluates blacklist, whitelist and arguments
//! 3. [`ConnectionAuthenticator`] supplies a credential
//! 4. [`RemoteExecutor`] runs the command under the command timeout
//!
//! Each policy decision is written to the [`AuditLogger`]. Errors keep their
//! full detail for logs and audit; [`GatewayError::client_message`] is the
//! only text meant for the client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::config::GatewayConfig;
use crate::domain::error::DomainError;
use crate::domain::policy::{ClientContext, DenialReason, PolicyDecision};
use crate::domain::repository::RepositoryError;
use crate::infrastructure::audit::{AuditLogger, AuditRecord};
use crate::infrastructure::policy_store::PolicyStore;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::ssh_auth::{AuthError, ConnectionAuthenticator, Credential};

/// Resource recorded for commands that do not target an application.
pub const HOST_RESOURCE: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), exit_code: 0 }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The host refused the credential. The authenticator cache is dropped.
    #[error("credential rejected by host: {0}")]
    AuthenticationRejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// SSH transport to the Dokku host.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        credential: &Credential,
        command: &str,
        args: &[String],
    ) -> Result<CommandOutput, ExecutionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("policy denied: {0}")]
    PolicyDenied(DenialReason),

    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    AuthenticationExhausted(#[from] AuthError),

    #[error("credential rejected by host: {0}")]
    AuthenticationRejected(String),

    #[error("remote execution failed: {0}")]
    Execution(String),

    #[error("command exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Text safe to return to an MCP client.
    pub fn client_message(&self) -> String {
        match self {
            Self::Domain(e) => e.to_string(),
            Self::Repository(e) => e.to_string(),
            Self::PolicyDenied(_) => "command rejected by security policy".to_string(),
            Self::RateLimited { retry_after } => {
                format!("rate limit exceeded, retry after {}s", retry_after.as_secs().max(1))
            }
            Self::AuthenticationExhausted(_) | Self::AuthenticationRejected(_) => {
                "unable to authenticate with the Dokku host".to_string()
            }
            Self::Execution(_) => "remote command could not be executed".to_string(),
            Self::CommandFailed { exit_code, stderr } => match stderr_excerpt(stderr) {
                None => format!("dokku command failed with exit code {}", exit_code),
                Some(excerpt) => {
                    format!("dokku command failed with exit code {}: {}", exit_code, excerpt)
                }
            },
            Self::Timeout(_) => "command timed out".to_string(),
        }
    }

    /// The Dokku host ran the command and reported failure.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

/// A command that passed rate limiting and policy.
#[derive(Debug, Clone)]
pub struct AuthorizedCommand {
    pub command: String,
    pub args: Vec<String>,
    pub decision: PolicyDecision,
}

pub struct CommandGateway {
    rate_limiter: RateLimiter,
    policy: Arc<PolicyStore>,
    authenticator: Arc<ConnectionAuthenticator>,
    executor: Arc<dyn RemoteExecutor>,
    audit: Arc<dyn AuditLogger>,
    command_timeout: Duration,
}

impl CommandGateway {
    pub fn new(
        rate_limiter: RateLimiter,
        policy: Arc<PolicyStore>,
        authenticator: Arc<ConnectionAuthenticator>,
        executor: Arc<dyn RemoteExecutor>,
        audit: Arc<dyn AuditLogger>,
        command_timeout: Duration,
    ) -> Self {
        Self { rate_limiter, policy, authenticator, executor, audit, command_timeout }
    }

    /// Gateway with the default credential chain.
    pub fn from_config(
        config: &GatewayConfig,
        executor: Arc<dyn RemoteExecutor>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self::new(
            RateLimiter::from_config(&config.security.rate_limit),
            Arc::new(PolicyStore::new(&config.security)),
            Arc::new(ConnectionAuthenticator::from_config(&config.ssh)),
            executor,
            audit,
            config.command_timeout,
        )
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn authenticator(&self) -> &ConnectionAuthenticator {
        &self.authenticator
    }

    /// Rate limit and policy check, without touching the host.
    pub async fn authorize(
        &self,
        client: &ClientContext,
        command: &str,
        args: &[String],
    ) -> Result<AuthorizedCommand, GatewayError> {
        let started = Instant::now();
        let resource = resource_of(args);

        if let Err(exceeded) = self.rate_limiter.check(&client.client_id) {
            let error = GatewayError::RateLimited { retry_after: exceeded.retry_after };
            self.audit
                .record(AuditRecord::failure(
                    &client.client_id,
                    command,
                    resource,
                    error.to_string(),
                    started.elapsed(),
                ))
                .await;
            return Err(error);
        }

        let decision = self.policy.evaluate(command, args, client);
        if let Some(reason) = decision.denied_reason.clone() {
            warn!(
                client_id = %client.client_id,
                command,
                reason = %reason,
                "command rejected by security policy"
            );
            self.audit
                .record(AuditRecord::failure(
                    &client.client_id,
                    command,
                    resource,
                    reason.to_string(),
                    started.elapsed(),
                ))
                .await;
            return Err(GatewayError::PolicyDenied(reason));
        }

        self.audit
            .record(AuditRecord::success(&client.client_id, command, resource, started.elapsed()))
            .await;
        Ok(AuthorizedCommand { command: command.to_string(), args: args.to_vec(), decision })
    }

    /// Authorize and run `command` on the Dokku host.
    ///
    /// A non-zero exit status is returned as [`GatewayError::CommandFailed`].
    pub async fn execute(
        &self,
        client: &ClientContext,
        command: &str,
        args: &[String],
    ) -> Result<CommandOutput, GatewayError> {
        let authorized = self.authorize(client, command, args).await?;

        let output = tokio::time::timeout(self.command_timeout, self.run(&authorized))
            .await
            .map_err(|_| {
                warn!(command, timeout = ?self.command_timeout, "dokku command timed out");
                GatewayError::Timeout(self.command_timeout)
            })??;

        if !output.is_success() {
            debug!(command, exit_code = output.exit_code, "dokku command failed");
            return Err(GatewayError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    async fn run(&self, authorized: &AuthorizedCommand) -> Result<CommandOutput, GatewayError> {
        let credential = self.authenticator.resolve().await?;
        match self
            .executor
            .execute(&credential, &authorized.command, &authorized.args)
            .await
        {
            Ok(output) => Ok(output),
            Err(ExecutionError::AuthenticationRejected(reason)) => {
                self.authenticator.report_failure(&credential).await;
                Err(GatewayError::AuthenticationRejected(reason))
            }
            Err(ExecutionError::Transport(reason)) => Err(GatewayError::Execution(reason)),
        }
    }
}

/// Dokku commands take the target application as their first positional argument.
fn resource_of(args: &[String]) -> &str {
    args.iter()
        .map(String::as_str)
        .find(|arg| !arg.starts_with('-'))
        .unwrap_or(HOST_RESOURCE)
}

/// Longest stderr excerpt returned to clients. The full text stays in logs and audit.
const CLIENT_STDERR_LIMIT: usize = 160;

/// First non-empty stderr line, cut to [`CLIENT_STDERR_LIMIT`] characters.
fn stderr_excerpt(stderr: &str) -> Option<String> {
    let line = stderr.lines().map(str::trim).find(|line| !line.is_empty())?;
    if line.chars().count() <= CLIENT_STDERR_LIMIT {
        return Some(line.to_string());
    }
    let mut excerpt: String = line.chars().take(CLIENT_STDERR_LIMIT).collect();
    excerpt.push_str("...");
    Some(excerpt)
}
