// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Dokku Command Whitelist
//!
//! The closed set of Dokku commands the gateway may ever forward. Anything that
//! does not parse into [`DokkuCommand`] is denied by
//! [`crate::domain::policy::CommandPolicyEngine`] before any argument is
//! inspected. Configuration can only narrow this set, never extend it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DokkuCommand {
    // System
    Version,
    Events,

    // Applications
    AppsList,
    AppsCreate,
    AppsReport,
    AppsExists,
    PsReport,
    PsScale,
    PsRestart,
    PsStart,
    PsStop,
    DomainsReport,
    DomainsAdd,
    DomainsRemove,
    BuildpacksReport,
    BuildpacksSet,
    ConfigShow,
    ConfigSet,
    Logs,

    // Proxy
    ProxyReport,
    ProxySet,

    // Scheduler
    SchedulerReport,
    SchedulerSet,

    // Git
    GitReport,
    GitSet,
    GitSync,

    // Plugins
    PluginList,
    PluginInstall,
    PluginUninstall,
    PluginEnable,
    PluginDisable,
    PluginUpdate,

    // SSH keys
    SshKeysList,
    SshKeysRemove,

    // Registry
    RegistryLogout,

    // Logs
    LogsSet,
}

impl DokkuCommand {
    pub const ALL: [DokkuCommand; 36] = [
        Self::Version,
        Self::Events,
        Self::AppsList,
        Self::AppsCreate,
        Self::AppsReport,
        Self::AppsExists,
        Self::PsReport,
        Self::PsScale,
        Self::PsRestart,
        Self::PsStart,
        Self::PsStop,
        Self::DomainsReport,
        Self::DomainsAdd,
        Self::DomainsRemove,
        Self::BuildpacksReport,
        Self::BuildpacksSet,
        Self::ConfigShow,
        Self::ConfigSet,
        Self::Logs,
        Self::ProxyReport,
        Self::ProxySet,
        Self::SchedulerReport,
        Self::SchedulerSet,
        Self::GitReport,
        Self::GitSet,
        Self::GitSync,
        Self::PluginList,
        Self::PluginInstall,
        Self::PluginUninstall,
        Self::PluginEnable,
        Self::PluginDisable,
        Self::PluginUpdate,
        Self::SshKeysList,
        Self::SshKeysRemove,
        Self::RegistryLogout,
        Self::LogsSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Events => "events",
            Self::AppsList => "apps:list",
            Self::AppsCreate => "apps:create",
            Self::AppsReport => "apps:report",
            Self::AppsExists => "apps:exists",
            Self::PsReport => "ps:report",
            Self::PsScale => "ps:scale",
            Self::PsRestart => "ps:restart",
            Self::PsStart => "ps:start",
            Self::PsStop => "ps:stop",
            Self::DomainsReport => "domains:report",
            Self::DomainsAdd => "domains:add",
            Self::DomainsRemove => "domains:remove",
            Self::BuildpacksReport => "buildpacks:report",
            Self::BuildpacksSet => "buildpacks:set",
            Self::ConfigShow => "config:show",
            Self::ConfigSet => "config:set",
            Self::Logs => "logs",
            Self::ProxyReport => "proxy:report",
            Self::ProxySet => "proxy:set",
            Self::SchedulerReport => "scheduler:report",
            Self::SchedulerSet => "scheduler:set",
            Self::GitReport => "git:report",
            Self::GitSet => "git:set",
            Self::GitSync => "git:sync",
            Self::PluginList => "plugin:list",
            Self::PluginInstall => "plugin:install",
            Self::PluginUninstall => "plugin:uninstall",
            Self::PluginEnable => "plugin:enable",
            Self::PluginDisable => "plugin:disable",
            Self::PluginUpdate => "plugin:update",
            Self::SshKeysList => "ssh-keys:list",
            Self::SshKeysRemove => "ssh-keys:remove",
            Self::RegistryLogout => "registry:logout",
            Self::LogsSet => "logs:set",
        }
    }

    /// Membership test for raw command strings.
    pub fn is_valid(command: &str) -> bool {
        command.parse::<Self>().is_ok()
    }
}

impl FromStr for DokkuCommand {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown dokku command '{}'", s)))
    }
}

impl TryFrom<String> for DokkuCommand {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DokkuCommand> for String {
    fn from(command: DokkuCommand) -> Self {
        command.as_str().to_string()
    }
}

impl fmt::Display for DokkuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
