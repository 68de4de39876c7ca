// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Shared Value Objects
//!
//! Validated identifiers used by the application aggregate. Each type can only
//! be built through its validating constructor (`new` / `TryFrom<String>`), so
//! holding one is proof that the value is well formed. Serde goes through the
//! same constructors.
//!
//! | Type | Rule |
//! |------|------|
//! | [`ApplicationName`] | DNS label, lowercase, 1-63 chars |
//! | [`DomainName`] | hostname, optional `*.` wildcard, case preserved |
//! | [`BuildpackName`] | URL or `[A-Za-z0-9._/:#@-]+` |
//! | [`EnvVarKey`] | `[A-Za-z_][A-Za-z0-9_]*` |
//! | [`GitRef`] | no whitespace, no leading `-`, no `..` |
//! | [`DockerImage`] | no whitespace |

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

const MAX_VALUE_LEN: usize = 255;
const MAX_DOMAIN_LEN: usize = 253;

static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex"));

static DOMAIN_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid regex")
});

static BUILDPACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/:#@-]+$").expect("valid regex"));

static ENV_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

fn has_whitespace_or_control(value: &str) -> bool {
    value.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Name of a Dokku application.
///
/// Input is trimmed and lowercased before validation, so `" Web-1 "` and
/// `"web-1"` are the same application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationName(String);

impl ApplicationName {
    pub fn new(name: &str) -> Result<Self, DomainError> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("application name cannot be empty"));
        }
        if !APP_NAME_RE.is_match(&normalized) {
            return Err(DomainError::Validation(format!(
                "invalid application name '{}': expected 1-63 lowercase alphanumerics or hyphens, \
                 not starting or ending with a hyphen",
                name
            )));
        }
        Ok(Self(normalized))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApplicationName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ApplicationName> for String {
    fn from(name: ApplicationName) -> Self {
        name.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Custom domain attached to an application.
///
/// Equality is exact: `Example.com` and `example.com` are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    pub fn new(domain: &str) -> Result<Self, DomainError> {
        if domain.is_empty() {
            return Err(DomainError::validation("domain name cannot be empty"));
        }
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(DomainError::Validation(format!(
                "domain name exceeds {} characters",
                MAX_DOMAIN_LEN
            )));
        }

        let host = domain.strip_prefix("*.").unwrap_or(domain);
        let valid = !host.is_empty() && host.split('.').all(|label| DOMAIN_LABEL_RE.is_match(label));
        if !valid {
            return Err(DomainError::Validation(format!("invalid domain name '{}'", domain)));
        }

        Ok(Self(domain.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DomainName> for String {
    fn from(domain: DomainName) -> Self {
        domain.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Buildpack reference: a registry short name or a git URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildpackName(String);

impl BuildpackName {
    pub fn new(name: &str) -> Result<Self, DomainError> {
        if name.is_empty() {
            return Err(DomainError::validation("buildpack name cannot be empty"));
        }
        if name.len() > MAX_VALUE_LEN {
            return Err(DomainError::Validation(format!(
                "buildpack name exceeds {} characters",
                MAX_VALUE_LEN
            )));
        }
        let is_url = name.starts_with("https://") || name.starts_with("http://");
        if is_url && has_whitespace_or_control(name) {
            return Err(DomainError::Validation(format!("invalid buildpack URL '{}'", name)));
        }
        if !is_url && !BUILDPACK_RE.is_match(name) {
            return Err(DomainError::Validation(format!("invalid buildpack name '{}'", name)));
        }
        Ok(Self(name.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BuildpackName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<BuildpackName> for String {
    fn from(name: BuildpackName) -> Self {
        name.0
    }
}

impl fmt::Display for BuildpackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Environment variable key (`config:set KEY=value`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvVarKey(String);

impl EnvVarKey {
    pub fn new(key: &str) -> Result<Self, DomainError> {
        if key.len() > MAX_VALUE_LEN {
            return Err(DomainError::Validation(format!(
                "environment variable key exceeds {} characters",
                MAX_VALUE_LEN
            )));
        }
        if !ENV_KEY_RE.is_match(key) {
            return Err(DomainError::Validation(format!(
                "invalid environment variable key '{}'",
                key
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EnvVarKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<EnvVarKey> for String {
    fn from(key: EnvVarKey) -> Self {
        key.0
    }
}

impl fmt::Display for EnvVarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Environment variable value. Stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVarValue(String);

impl EnvVarValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Git reference (branch, tag or commit) to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitRef(String);

impl GitRef {
    pub fn new(reference: &str) -> Result<Self, DomainError> {
        if reference.is_empty() {
            return Err(DomainError::validation("git reference cannot be empty"));
        }
        if reference.len() > MAX_VALUE_LEN {
            return Err(DomainError::Validation(format!(
                "git reference exceeds {} characters",
                MAX_VALUE_LEN
            )));
        }
        // A leading dash would be read as an option by git on the remote host.
        if reference.starts_with('-') || reference.contains("..") || has_whitespace_or_control(reference) {
            return Err(DomainError::Validation(format!("invalid git reference '{}'", reference)));
        }
        Ok(Self(reference.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GitRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GitRef> for String {
    fn from(reference: GitRef) -> Self {
        reference.0
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Container image reference used for build or run stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DockerImage(String);

impl DockerImage {
    pub fn new(image: &str) -> Result<Self, DomainError> {
        if image.is_empty() {
            return Err(DomainError::validation("docker image cannot be empty"));
        }
        if image.len() > MAX_VALUE_LEN || has_whitespace_or_control(image) {
            return Err(DomainError::Validation(format!("invalid docker image '{}'", image)));
        }
        Ok(Self(image.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DockerImage {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DockerImage> for String {
    fn from(image: DockerImage) -> Self {
        image.0
    }
}

impl fmt::Display for DockerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_name_normalizes_and_validates() {
        assert_eq!(ApplicationName::new(" Web-1 ").unwrap().value(), "web-1");
        assert_eq!(ApplicationName::new("a").unwrap().value(), "a");
        assert!(ApplicationName::new(&"a".repeat(63)).is_ok());

        for bad in ["", "-web", "web-", "web_1", "web.1", &"a".repeat(64)] {
            assert!(
                matches!(ApplicationName::new(bad), Err(DomainError::Validation(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_application_name_equality_uses_normalized_value() {
        assert_eq!(ApplicationName::new("API").unwrap(), ApplicationName::new("api").unwrap());
    }

    #[test]
    fn test_domain_name_rules() {
        assert!(DomainName::new("example.com").is_ok());
        assert!(DomainName::new("*.apps.example.com").is_ok());
        assert!(DomainName::new("localhost").is_ok());
        assert!(DomainName::new("Example.COM").is_ok());

        assert!(DomainName::new("").is_err());
        assert!(DomainName::new("exa mple.com").is_err());
        assert!(DomainName::new("-bad.example.com").is_err());
        assert!(DomainName::new("example..com").is_err());
        assert!(DomainName::new("*.").is_err());
        assert!(DomainName::new("example.com;rm").is_err());
    }

    #[test]
    fn test_domain_name_keeps_case() {
        let upper = DomainName::new("Example.com").unwrap();
        let lower = DomainName::new("example.com").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper.value(), "Example.com");
    }

    #[test]
    fn test_buildpack_name_accepts_urls_and_names() {
        assert!(BuildpackName::new("heroku/nodejs").is_ok());
        assert!(BuildpackName::new("https://github.com/heroku/heroku-buildpack-go.git#v1").is_ok());
        assert!(BuildpackName::new("").is_err());
        assert!(BuildpackName::new("heroku/nodejs; ls").is_err());
        assert!(BuildpackName::new("https://example.com/a b").is_err());
    }

    #[test]
    fn test_env_var_key_rules() {
        assert!(EnvVarKey::new("DATABASE_URL").is_ok());
        assert!(EnvVarKey::new("_private").is_ok());
        assert!(EnvVarKey::new("1ABC").is_err());
        assert!(EnvVarKey::new("A-B").is_err());
        assert!(EnvVarKey::new("").is_err());
    }

    #[test]
    fn test_git_ref_rejects_option_injection() {
        assert!(GitRef::new("main").is_ok());
        assert!(GitRef::new("refs/tags/v1.2.0").is_ok());
        assert!(GitRef::new("--upload-pack=evil").is_err());
        assert!(GitRef::new("main..other").is_err());
        assert!(GitRef::new("with space").is_err());
        assert!(GitRef::new("").is_err());
    }

    #[test]
    fn test_value_objects_deserialize_through_validation() {
        let ok: DomainName = serde_json::from_str("\"example.com\"").unwrap();
        assert_eq!(ok.value(), "example.com");
        assert!(serde_json::from_str::<DomainName>("\"not a domain\"").is_err());
        assert!(serde_json::from_str::<ApplicationName>("\"-x\"").is_err());
    }
}
