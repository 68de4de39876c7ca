// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use dokku_mcp_core::domain::config::{GatewayConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./dokku-mcp.yaml)
        #[arg(short, long, default_value = "./dokku-mcp.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples, force } => generate(&output, examples, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = GatewayConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./dokku-mcp.yaml");
        println!("  4. ~/.dokku-mcp/config.yaml");
        println!("  5. /etc/dokku-mcp/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "SSH:".bold());
    println!("  Target: {}@{}:{}", config.ssh.user, config.ssh.host, config.ssh.port);
    match &config.ssh.key_path {
        Some(path) => println!("  Key path: {}", path.display()),
        None => println!("  Key path: {}", "(agent / default keys)".dimmed()),
    }
    println!("  Connect timeout: {:?}", config.ssh.connect_timeout);
    println!();

    println!("{}", "Security:".bold());
    println!("  Blacklist: {}", config.security.blacklist.join(", "));
    if config.security.allowed_commands.is_empty() {
        println!("  Allowed commands: {}", "(all built-in commands)".dimmed());
    } else {
        println!("  Allowed commands: {}", config.security.allowed_commands.len());
        for command in &config.security.allowed_commands {
            println!("    - {}", command);
        }
    }
    println!("  Max argument length: {}", config.security.max_argument_length);
    let rate_limit = &config.security.rate_limit;
    println!(
        "  Rate limit: {} requests / {:?}, block {:?}",
        rate_limit.requests_per_window, rate_limit.window, rate_limit.block_duration
    );
    println!();

    println!("{}", "Runtime:".bold());
    println!("  Command timeout: {:?}", config.command_timeout);
    println!(
        "  Cache: {}",
        if config.cache.enabled { format!("enabled (ttl {:?})", config.cache.ttl) } else { "disabled".to_string() }
    );
    println!("  Logging: {} ({:?})", config.logging.level, config.logging.format);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GatewayConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn sample(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

async fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    std::fs::write(output, sample(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
