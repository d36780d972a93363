//! Typed job payloads.
//!
//! Payloads arrive as JSON tagged by `kind` and are validated before a job
//! is created, so agents never receive a payload they cannot act on.

use serde::{Deserialize, Serialize};

use crate::env_bundle::validate_env_token;
use crate::error::CoreError;

/// Maximum number of arguments in a `command` payload.
const MAX_ARGS: usize = 64;

/// Work an agent is asked to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Deploy an application from a git repository.
    Deploy {
        repo_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        /// Single-page app deployments use the static-site flow.
        #[serde(default)]
        is_spa: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env_token: Option<String>,
    },
    /// Run the agent's job runner with explicit arguments.
    Command {
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env_token: Option<String>,
    },
}

impl JobPayload {
    /// The env bundle this payload references, if any.
    pub fn env_token(&self) -> Option<&str> {
        match self {
            JobPayload::Deploy { env_token, .. } | JobPayload::Command { env_token, .. } => {
                env_token.as_deref()
            }
        }
    }

    /// Validate the payload contents.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            JobPayload::Deploy {
                repo_url, domain, ..
            } => {
                derive_app_name(repo_url)?;
                if let Some(domain) = domain {
                    validate_domain(domain)?;
                }
            }
            JobPayload::Command { args, .. } => validate_args(args)?,
        }
        if let Some(token) = self.env_token() {
            validate_env_token(token)?;
        }
        Ok(())
    }
}

/// Derive a filesystem-safe application name from a repository URL.
///
/// Takes the last path segment, strips a trailing `.git`, and rejects
/// anything that could escape the apps directory.
pub fn derive_app_name(repo_url: &str) -> Result<String, CoreError> {
    let trimmed = repo_url.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("repo_url must not be empty".into()));
    }

    // Drop scheme/authority so `https://host/org/app.git` and
    // `git@host:org/app.git` both resolve to their path.
    let path = match trimmed.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, p)| p),
        None => trimmed.rsplit_once(':').map_or(trimmed, |(_, p)| p),
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let base = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let name = base.strip_suffix(".git").unwrap_or(base);

    if name.is_empty() || name.contains('\\') || name.contains("..") || name.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "Cannot derive a safe app name from repo_url: {repo_url}"
        )));
    }
    Ok(name.to_string())
}

/// Validate a DNS domain name (at least two labels).
pub fn validate_domain(domain: &str) -> Result<(), CoreError> {
    let err = || CoreError::Validation(format!("Invalid domain '{domain}'"));

    if domain.len() > 253 || !domain.contains('.') {
        return Err(err());
    }
    for label in domain.split('.') {
        if label.is_empty()
            || label.len() > 63
            || label.starts_with('-')
            || label.ends_with('-')
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(err());
        }
    }
    Ok(())
}

fn validate_args(args: &[String]) -> Result<(), CoreError> {
    if args.is_empty() {
        return Err(CoreError::Validation(
            "Command payload requires at least one argument".into(),
        ));
    }
    if args.len() > MAX_ARGS {
        return Err(CoreError::Validation(format!(
            "Command payload may have at most {MAX_ARGS} arguments"
        )));
    }
    if let Some(i) = args.iter().position(|a| a.is_empty()) {
        return Err(CoreError::Validation(format!(
            "Argument at index {i} must not be empty"
        )));
    }
    Ok(())
}
