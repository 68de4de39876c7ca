// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Dokku MCP operator CLI
//!
//! The `dokku-mcp` binary inspects the gateway the way the server would see
//! it, without talking to an MCP client.
//!
//! ## Commands
//!
//! - `dokku-mcp config show|validate|generate` - Configuration management
//! - `dokku-mcp policy check|commands` - Dry-run the command policy
//! - `dokku-mcp auth probe` - Walk the SSH credential chain

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use dokku_mcp_core::domain::config::{GatewayConfig, LogFormat, CONFIG_PATH_ENV};

mod commands;

use commands::{AuthCommand, ConfigCommand, PolicyCommand};

/// Dokku MCP - Policy-checked Dokku access for MCP clients
#[derive(Parser)]
#[command(name = "dokku-mcp")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides logging.level)
    #[arg(long, global = true, env = "DOKKU_MCP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (overrides logging.format)
    #[arg(long, global = true, value_enum, env = "DOKKU_MCP_LOG_FORMAT")]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Command policy inspection
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// SSH credential resolution
    #[command(name = "auth")]
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging settings come from the config file unless overridden on the
    // command line. A broken config file is reported by the command itself.
    let logging = GatewayConfig::load_or_default(cli.config.clone())
        .map(|config| config.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let format = cli.log_format.map(LogFormat::from).unwrap_or(logging.format);
    init_logging(&level, format)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Policy { command }) => {
            commands::policy::handle_command(command, cli.config).await
        }
        Some(Commands::Auth { command }) => {
            commands::auth::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.with_target(false).compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}
