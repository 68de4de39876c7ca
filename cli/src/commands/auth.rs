// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! SSH credential commands
//!
//! Commands: probe

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use dokku_mcp_core::domain::config::GatewayConfig;
use dokku_mcp_core::infrastructure::ssh_auth::ConnectionAuthenticator;

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Walk the credential chain and report which strategy succeeds
    Probe,
}

pub async fn handle_command(command: AuthCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        AuthCommand::Probe => probe(config_override).await,
    }
}

async fn probe(config_override: Option<PathBuf>) -> Result<()> {
    let config = GatewayConfig::load_or_default(config_override).context("Failed to load configuration")?;
    let authenticator = ConnectionAuthenticator::from_config(&config.ssh);

    println!(
        "Resolving credential for {}@{}:{}",
        config.ssh.user, config.ssh.host, config.ssh.port
    );
    let order: Vec<_> = authenticator.strategy_tags().iter().map(|t| t.as_str()).collect();
    println!("  Strategies: {}", order.join(" → ").dimmed());

    match authenticator.resolve().await {
        Ok(credential) => {
            println!("{} {}", "✓ credential:".green().bold(), credential);
            Ok(())
        }
        Err(error) => {
            println!("{}", "✗ no usable credential".red().bold());
            for attempt in error.attempts() {
                if let Err(reason) = &attempt.outcome {
                    println!("  {}: {}", attempt.strategy.to_string().bold(), reason);
                }
            }
            Err(error).context("SSH authentication exhausted")
        }
    }
}
