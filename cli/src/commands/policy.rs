// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command policy inspection
//!
//! Commands: check, commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use dokku_mcp_core::domain::commands::DokkuCommand;
use dokku_mcp_core::domain::config::GatewayConfig;
use dokku_mcp_core::domain::policy::{ClientContext, CommandPolicyEngine, PolicyDecision};

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Evaluate a command against the configured policy
    Check {
        /// Dokku command, e.g. ps:scale
        command: String,

        /// Command arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Client identifier recorded in the decision log
        #[arg(long, default_value = "cli")]
        client: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in commands and whether the policy allows them
    Commands,
}

pub async fn handle_command(command: PolicyCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = GatewayConfig::load_or_default(config_override).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let engine = CommandPolicyEngine::new(&config.security);

    match command {
        PolicyCommand::Check { command, args, client, json } => {
            let decision = engine.evaluate(&command, &args, &ClientContext::new(client));
            print_decision(&command, &decision, json)?;
            if !decision.allowed {
                std::process::exit(2);
            }
            Ok(())
        }
        PolicyCommand::Commands => {
            list_commands(&engine);
            Ok(())
        }
    }
}

fn print_decision(command: &str, decision: &PolicyDecision, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(decision)?);
        return Ok(());
    }

    match &decision.denied_reason {
        None => println!("{} {}", "✓ allowed:".green().bold(), command),
        Some(reason) => {
            println!("{} {}", "✗ denied:".red().bold(), command);
            println!("  Reason: {}", reason);
        }
    }
    println!("  Matched rule: {:?}", decision.matched_rule);
    Ok(())
}

fn list_commands(engine: &CommandPolicyEngine) {
    let client = ClientContext::new("cli");
    for command in DokkuCommand::ALL {
        let decision = engine.evaluate(command.as_str(), &[], &client);
        let marker = if decision.allowed { "✓".green() } else { "✗".red() };
        match decision.denied_reason {
            None => println!("  {} {}", marker, command),
            Some(reason) => println!("  {} {} {}", marker, command, format!("({})", reason).dimmed()),
        }
    }
}
