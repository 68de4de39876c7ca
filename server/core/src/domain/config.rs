// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the YAML configuration for the Dokku MCP server, including:
// - SSH target and credential hints
// - Security policy (blacklist, allowed commands, rate limiting)
// - Read-model cache settings (consumed by the presentation layer)
// - Logging settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::commands::DokkuCommand;

pub const CONFIG_PATH_ENV: &str = "DOKKU_MCP_CONFIG_PATH";

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upper bound for a single remote command, including credential resolution
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_host")]
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_ssh_user")]
    pub user: String,

    /// Explicit private key, tried after the agent and the default key files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Substrings that deny any command containing them
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,

    /// Narrows the built-in command set. Empty means every built-in command.
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    #[serde(default = "default_max_argument_length")]
    pub max_argument_length: usize,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    #[serde(default = "default_block_duration", with = "humantime_serde")]
    pub block_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_true() -> bool {
    true
}

fn default_ssh_host() -> String {
    "localhost".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_user() -> String {
    "dokku".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_blacklist() -> Vec<String> {
    ["destroy", "unset", "remove", "uninstall"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_argument_length() -> usize {
    255
}

fn default_requests_per_window() -> u32 {
    60
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_block_duration() -> Duration {
    Duration::from_secs(300)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ssh: SshConfig::default(),
            security: SecurityConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            command_timeout: default_command_timeout(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: default_ssh_host(),
            port: default_ssh_port(),
            user: default_ssh_user(),
            key_path: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            blacklist: default_blacklist(),
            allowed_commands: Vec::new(),
            max_argument_length: default_max_argument_length(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window: default_window(),
            block_duration: default_block_duration(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate locations, in precedence order, after an explicit path
    pub fn discovery_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./dokku-mcp.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dokku-mcp").join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/dokku-mcp/config.yaml"));
        paths
    }

    /// Discover configuration file using precedence order
    /// 1. DOKKU_MCP_CONFIG_PATH environment variable
    /// 2. ./dokku-mcp.yaml (working directory)
    /// 3. ~/.dokku-mcp/config.yaml (user home)
    /// 4. /etc/dokku-mcp/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        Self::discovery_paths().into_iter().find(|path| path.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("DOKKU_MCP_SSH_HOST") {
            tracing::info!("Environment override: DOKKU_MCP_SSH_HOST={}", host);
            self.ssh.host = host;
        }

        if let Some(port) = lookup("DOKKU_MCP_SSH_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: DOKKU_MCP_SSH_PORT={}", port);
                    self.ssh.port = port;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for DOKKU_MCP_SSH_PORT: '{}'. Expected a port number. Ignoring.",
                    port
                ),
            }
        }

        if let Some(user) = lookup("DOKKU_MCP_SSH_USER") {
            tracing::info!("Environment override: DOKKU_MCP_SSH_USER={}", user);
            self.ssh.user = user;
        }

        if let Some(key_path) = lookup("DOKKU_MCP_SSH_KEY_PATH") {
            tracing::info!("Environment override: DOKKU_MCP_SSH_KEY_PATH set");
            self.ssh.key_path = if key_path.is_empty() { None } else { Some(PathBuf::from(key_path)) };
        }

        if let Some(level) = lookup("DOKKU_MCP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("DOKKU_MCP_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "text" => self.logging.format = LogFormat::Text,
                "json" => self.logging.format = LogFormat::Json,
                _ => tracing::warn!(
                    "Invalid value for DOKKU_MCP_LOG_FORMAT: '{}'. Expected text/json. Ignoring.",
                    format
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ssh.host.trim().is_empty() {
            anyhow::bail!("ssh.host cannot be empty");
        }
        if self.ssh.user.trim().is_empty() {
            anyhow::bail!("ssh.user cannot be empty");
        }
        if self.ssh.port == 0 {
            anyhow::bail!("ssh.port must be between 1 and 65535");
        }
        if self.ssh.connect_timeout.is_zero() {
            anyhow::bail!("ssh.connect_timeout must be greater than zero");
        }
        if self.command_timeout.is_zero() {
            anyhow::bail!("command_timeout must be greater than zero");
        }

        if self.security.blacklist.iter().any(|pattern| pattern.trim().is_empty()) {
            anyhow::bail!("security.blacklist cannot contain empty patterns");
        }
        for command in &self.security.allowed_commands {
            if !DokkuCommand::is_valid(command) {
                anyhow::bail!(
                    "security.allowed_commands contains unknown command '{}'",
                    command
                );
            }
        }
        if self.security.max_argument_length == 0 {
            anyhow::bail!("security.max_argument_length must be greater than zero");
        }

        let rate_limit = &self.security.rate_limit;
        if rate_limit.requests_per_window == 0 {
            anyhow::bail!("security.rate_limit.requests_per_window must be greater than zero");
        }
        if rate_limit.window.is_zero() {
            anyhow::bail!("security.rate_limit.window must be greater than zero");
        }

        if self.cache.enabled && self.cache.ttl.is_zero() {
            anyhow::bail!("cache.ttl must be greater than zero when the cache is enabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ssh.user, "dokku");
        assert_eq!(config.security.blacklist, vec!["destroy", "unset", "remove", "uninstall"]);
        assert_eq!(config.security.rate_limit.window, Duration::from_secs(60));
    }

    #[test]
    fn test_yaml_parsing_with_durations() {
        let yaml = r#"
ssh:
  host: dokku.example.com
  port: 2222
  key_path: /keys/dokku
  connect_timeout: 5s
security:
  blacklist: [destroy]
  allowed_commands: ["apps:list", "ps:scale"]
  rate_limit:
    requests_per_window: 10
    window: 30s
    block_duration: 2m
logging:
  level: debug
  format: json
command_timeout: 1m
"#;
        let config = GatewayConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.ssh.host, "dokku.example.com");
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.ssh.key_path, Some(PathBuf::from("/keys/dokku")));
        assert_eq!(config.ssh.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.security.rate_limit.block_duration, Duration::from_secs(120));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert!(config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = GatewayConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = GatewayConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation() {
        let mut config = GatewayConfig::default();
        config.security.allowed_commands = vec!["apps:destroy".to_string()];
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.security.rate_limit.requests_per_window = 0;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.ssh.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DOKKU_MCP_SSH_HOST", "paas.internal"),
            ("DOKKU_MCP_SSH_PORT", "not-a-port"),
            ("DOKKU_MCP_SSH_KEY_PATH", "/tmp/key"),
            ("DOKKU_MCP_LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = GatewayConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ssh.host, "paas.internal");
        assert_eq!(config.ssh.port, 22);
        assert_eq!(config.ssh.key_path, Some(PathBuf::from("/tmp/key")));
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
