// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

static PROCESS_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{0,62}$").expect("valid regex"));

/// Procfile process role, e.g. `web` or `worker`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcessType(String);

impl ProcessType {
    pub fn new(process_type: &str) -> Result<Self, DomainError> {
        if !PROCESS_TYPE_RE.is_match(process_type) {
            return Err(DomainError::Validation(format!(
                "invalid process type '{}'",
                process_type
            )));
        }
        Ok(Self(process_type.to_string()))
    }

    pub fn web() -> Self {
        Self("web".to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProcessType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ProcessType> for String {
    fn from(process_type: ProcessType) -> Self {
        process_type.0
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts a client-supplied instance count to a scale, rejecting negatives.
pub fn validate_scale(instances: i64) -> Result<u32, DomainError> {
    if instances < 0 {
        return Err(DomainError::Validation(format!(
            "scale cannot be negative (got {})",
            instances
        )));
    }
    u32::try_from(instances)
        .map_err(|_| DomainError::Validation(format!("scale {} is out of range", instances)))
}

/// A process declared for an application.
///
/// `command` is `None` when the process was declared only for scaling and the
/// command is resolved from the Procfile at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    process_type: ProcessType,
    command: Option<String>,
    scale: u32,
}

impl Process {
    pub fn new(process_type: ProcessType, command: &str, scale: i64) -> Result<Self, DomainError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(DomainError::Validation(format!(
                "command for process '{}' cannot be empty",
                process_type
            )));
        }
        Ok(Self {
            process_type,
            command: Some(command.to_string()),
            scale: validate_scale(scale)?,
        })
    }

    pub fn for_scaling(process_type: ProcessType, scale: i64) -> Result<Self, DomainError> {
        Ok(Self {
            process_type,
            command: None,
            scale: validate_scale(scale)?,
        })
    }

    pub fn process_type(&self) -> &ProcessType {
        &self.process_type
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn set_scale(&mut self, instances: i64) -> Result<(), DomainError> {
        self.scale = validate_scale(instances)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_requires_command() {
        assert!(Process::new(ProcessType::web(), "  ", 1).is_err());
        let process = Process::new(ProcessType::web(), "npm start", 2).unwrap();
        assert_eq!(process.command(), Some("npm start"));
        assert_eq!(process.scale(), 2);
    }

    #[test]
    fn test_negative_scale_is_rejected() {
        assert!(matches!(
            Process::for_scaling(ProcessType::web(), -1),
            Err(DomainError::Validation(_))
        ));

        let mut process = Process::for_scaling(ProcessType::web(), 3).unwrap();
        assert!(process.set_scale(-2).is_err());
        assert_eq!(process.scale(), 3);
    }

    #[test]
    fn test_process_type_rules() {
        assert!(ProcessType::new("worker").is_ok());
        assert!(ProcessType::new("release_task").is_ok());
        assert!(ProcessType::new("Web").is_err());
        assert!(ProcessType::new("").is_err());
        assert!(ProcessType::new("1web").is_err());
    }
}
