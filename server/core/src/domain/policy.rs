// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Command Policy Engine
//!
//! Pure allow/deny decision for a requested Dokku command. Checks run in this
//! order and the first failure decides:
//!
//! 1. Blacklist: the command contains a configured substring (always wins)
//! 2. Whitelist: the command is not a member of the allowed set
//! 3. Arguments: forbidden shell metacharacters or over-long values
//!
//! The engine is immutable once built; reloading configuration means building
//! a new engine (see [`crate::infrastructure::policy_store::PolicyStore`]).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::commands::DokkuCommand;
use crate::domain::config::SecurityConfig;

/// Characters that could change how the remote shell interprets an argument.
pub const FORBIDDEN_ARGUMENT_CHARS: [char; 15] = [
    ';', '|', '&', '$', '`', '(', ')', '{', '}', '[', ']', '<', '>', '\n', '\r',
];

/// Caller identity attached to every evaluation, for logging and auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub client_id: String,
}

impl ClientContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self { client_id: client_id.into() }
    }
}

/// The rule that decided a [`PolicyDecision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MatchedRule {
    Blacklist(String),
    Whitelist(String),
    /// The command was whitelisted but argument number `index` was rejected.
    ArgumentSanitizer { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    Blacklisted { pattern: String },
    NotWhitelisted { command: String },
    ForbiddenCharacter { index: usize, character: char },
    ArgumentTooLong { index: usize, length: usize, max: usize },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blacklisted { pattern } => {
                write!(f, "command matches blacklisted pattern '{}'", pattern)
            }
            Self::NotWhitelisted { command } => write!(f, "command '{}' is not whitelisted", command),
            Self::ForbiddenCharacter { index, character } => {
                write!(f, "argument {} contains forbidden character {:?}", index, character)
            }
            Self::ArgumentTooLong { index, length, max } => {
                write!(f, "argument {} is {} characters long (max {})", index, length, max)
            }
        }
    }
}

/// Outcome of [`CommandPolicyEngine::evaluate`].
///
/// `denied_reason` is `Some` exactly when `allowed` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub denied_reason: Option<DenialReason>,
    pub matched_rule: MatchedRule,
}

impl PolicyDecision {
    fn allow(rule: MatchedRule) -> Self {
        Self { allowed: true, denied_reason: None, matched_rule: rule }
    }

    fn deny(reason: DenialReason, rule: MatchedRule) -> Self {
        Self { allowed: false, denied_reason: Some(reason), matched_rule: rule }
    }
}

#[derive(Debug, Clone)]
pub struct CommandPolicyEngine {
    /// Lowercased blacklist patterns, in configuration order.
    blacklist: Vec<String>,
    whitelist: HashSet<String>,
    max_argument_length: usize,
}

impl CommandPolicyEngine {
    /// Build an engine from the security section of the configuration.
    ///
    /// An empty `allowed_commands` list means the whole built-in
    /// [`DokkuCommand`] set. Entries outside that set are dropped, so the
    /// configuration can only narrow it.
    pub fn new(config: &SecurityConfig) -> Self {
        let blacklist = config
            .blacklist
            .iter()
            .map(|pattern| pattern.trim().to_lowercase())
            .filter(|pattern| !pattern.is_empty())
            .collect();

        let whitelist = if config.allowed_commands.is_empty() {
            DokkuCommand::ALL.iter().map(|c| c.as_str().to_string()).collect()
        } else {
            config
                .allowed_commands
                .iter()
                .filter(|command| {
                    let known = DokkuCommand::is_valid(command);
                    if !known {
                        tracing::warn!(command = %command, "ignoring unknown command in allowed_commands");
                    }
                    known
                })
                .cloned()
                .collect()
        };

        Self {
            blacklist,
            whitelist,
            max_argument_length: config.max_argument_length,
        }
    }

    pub fn is_whitelisted(&self, command: &str) -> bool {
        self.whitelist.contains(command)
    }

    pub fn evaluate(&self, command: &str, args: &[String], client: &ClientContext) -> PolicyDecision {
        let decision = self.decide(command, args);
        match &decision.denied_reason {
            None => tracing::debug!(
                client_id = %client.client_id,
                command,
                "command allowed by policy"
            ),
            Some(reason) => tracing::debug!(
                client_id = %client.client_id,
                command,
                reason = %reason,
                "command denied by policy"
            ),
        }
        decision
    }

    fn decide(&self, command: &str, args: &[String]) -> PolicyDecision {
        // 1. Blacklist first, whitelist membership does not matter
        let lowered = command.to_lowercase();
        if let Some(pattern) = self.blacklist.iter().find(|pattern| lowered.contains(pattern.as_str())) {
            return PolicyDecision::deny(
                DenialReason::Blacklisted { pattern: pattern.clone() },
                MatchedRule::Blacklist(pattern.clone()),
            );
        }

        // 2. Closed whitelist
        if !self.whitelist.contains(command) {
            return PolicyDecision::deny(
                DenialReason::NotWhitelisted { command: command.to_string() },
                MatchedRule::Whitelist(command.to_string()),
            );
        }

        // 3. Argument sanitization
        for (index, arg) in args.iter().enumerate() {
            let length = arg.chars().count();
            if length > self.max_argument_length {
                return PolicyDecision::deny(
                    DenialReason::ArgumentTooLong { index, length, max: self.max_argument_length },
                    MatchedRule::ArgumentSanitizer { index },
                );
            }
            if let Some(character) = arg.chars().find(|c| FORBIDDEN_ARGUMENT_CHARS.contains(c)) {
                return PolicyDecision::deny(
                    DenialReason::ForbiddenCharacter { index, character },
                    MatchedRule::ArgumentSanitizer { index },
                );
            }
        }

        PolicyDecision::allow(MatchedRule::Whitelist(command.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientContext {
        ClientContext::new("c1")
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn engine_with(blacklist: &[&str], allowed: &[&str]) -> CommandPolicyEngine {
        CommandPolicyEngine::new(&SecurityConfig {
            blacklist: args(blacklist),
            allowed_commands: args(allowed),
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn test_blacklist_wins_over_whitelist() {
        let engine = engine_with(&["destroy"], &["apps:destroy"]);
        let decision = engine.evaluate("apps:destroy", &[], &client());

        assert!(!decision.allowed);
        assert_eq!(decision.matched_rule, MatchedRule::Blacklist("destroy".to_string()));
        assert_eq!(
            decision.denied_reason,
            Some(DenialReason::Blacklisted { pattern: "destroy".to_string() })
        );
    }

    #[test]
    fn test_default_blacklist_blocks_whitelisted_core_commands() {
        let engine = CommandPolicyEngine::new(&SecurityConfig::default());
        assert!(engine.is_whitelisted("plugin:uninstall"));
        assert!(!engine.evaluate("plugin:uninstall", &args(&["letsencrypt"]), &client()).allowed);
        assert!(!engine.evaluate("ssh-keys:remove", &args(&["admin"]), &client()).allowed);
        assert!(!engine.evaluate("domains:remove", &args(&["web", "a.com"]), &client()).allowed);
    }

    #[test]
    fn test_blacklist_match_ignores_case() {
        let engine = engine_with(&["Destroy"], &[]);
        let decision = engine.evaluate("APPS:DESTROY", &[], &client());
        assert_eq!(decision.matched_rule, MatchedRule::Blacklist("destroy".to_string()));
    }

    #[test]
    fn test_non_whitelisted_command_denied() {
        let engine = engine_with(&[], &["apps:list"]);
        let decision = engine.evaluate("ps:scale", &args(&["web", "web=2"]), &client());
        assert!(!decision.allowed);
        assert_eq!(
            decision.denied_reason,
            Some(DenialReason::NotWhitelisted { command: "ps:scale".to_string() })
        );

        let decision = engine_with(&[], &[]).evaluate("shell", &[], &client());
        assert!(!decision.allowed);
    }

    #[test]
    fn test_allowed_commands_cannot_extend_builtin_set() {
        let engine = engine_with(&[], &["run", "apps:list"]);
        assert!(!engine.is_whitelisted("run"));

        let decision = engine.evaluate("run", &args(&["web-1", "bash"]), &client());
        assert!(!decision.allowed);
        assert_eq!(
            decision.denied_reason,
            Some(DenialReason::NotWhitelisted { command: "run".to_string() })
        );
        assert!(engine.evaluate("apps:list", &[], &client()).allowed);

        // Only unknown entries configured: nothing is allowed
        let engine = engine_with(&[], &["run"]);
        assert!(!engine.evaluate("apps:list", &[], &client()).allowed);
    }

    #[test]
    fn test_forbidden_characters_report_index_and_character() {
        let engine = engine_with(&[], &[]);
        for (arg, character) in [
            ("web; rm -rf /", ';'),
            ("a|b", '|'),
            ("$(id)", '$'),
            ("`id`", '`'),
            ("x\ny", '\n'),
            ("<in", '<'),
        ] {
            let decision = engine.evaluate("config:show", &args(&["ok", arg]), &client());
            assert!(!decision.allowed, "{:?} should be rejected", arg);
            assert_eq!(
                decision.denied_reason,
                Some(DenialReason::ForbiddenCharacter { index: 1, character })
            );
            assert_eq!(decision.matched_rule, MatchedRule::ArgumentSanitizer { index: 1 });
        }
    }

    #[test]
    fn test_argument_length_limit() {
        let engine = engine_with(&[], &[]);
        let at_limit = "a".repeat(255);
        assert!(engine.evaluate("apps:report", &[at_limit], &client()).allowed);

        let too_long = "a".repeat(256);
        let decision = engine.evaluate("apps:report", &[too_long], &client());
        assert_eq!(
            decision.denied_reason,
            Some(DenialReason::ArgumentTooLong { index: 0, length: 256, max: 255 })
        );
    }

    #[test]
    fn test_allowed_decision_records_whitelist_entry() {
        let engine = CommandPolicyEngine::new(&SecurityConfig::default());
        let decision = engine.evaluate("ps:scale", &args(&["web-1", "web=3"]), &client());
        assert!(decision.allowed);
        assert!(decision.denied_reason.is_none());
        assert_eq!(decision.matched_rule, MatchedRule::Whitelist("ps:scale".to_string()));
    }
}
