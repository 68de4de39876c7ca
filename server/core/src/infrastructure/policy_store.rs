// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Hot-swappable holder for the active [`CommandPolicyEngine`].
//!
//! Readers clone the `Arc` and evaluate against that snapshot, so a reload
//! never waits for in-flight evaluations and never changes their outcome.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::domain::config::SecurityConfig;
use crate::domain::policy::{ClientContext, CommandPolicyEngine, PolicyDecision};

#[derive(Debug)]
pub struct PolicyStore {
    engine: RwLock<Arc<CommandPolicyEngine>>,
}

impl PolicyStore {
    pub fn new(config: &SecurityConfig) -> Self {
        Self { engine: RwLock::new(Arc::new(CommandPolicyEngine::new(config))) }
    }

    pub fn current(&self) -> Arc<CommandPolicyEngine> {
        Arc::clone(&self.engine.read())
    }

    pub fn evaluate(&self, command: &str, args: &[String], client: &ClientContext) -> PolicyDecision {
        self.current().evaluate(command, args, client)
    }

    /// Build a new engine and make it visible to subsequent evaluations.
    pub fn reload(&self, config: &SecurityConfig) {
        let engine = Arc::new(CommandPolicyEngine::new(config));
        *self.engine.write() = engine;
        info!(
            blacklist = config.blacklist.len(),
            allowed_commands = config.allowed_commands.len(),
            "command policy reloaded"
        );
    }
}
