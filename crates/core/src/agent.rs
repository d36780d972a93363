//! Agent registry constants, liveness rules, and registration validation.
//!
//! Pure functions used by the store's `AgentRepo` and the API handlers.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// If an agent has not sent a heartbeat within this many seconds,
/// it is considered offline and is flipped accordingly.
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 120;

/// How often the heartbeat monitor checks for stale agents.
pub const HEARTBEAT_CHECK_INTERVAL_SECS: u64 = 30;

/// Largest heartbeat timeout representable as a `chrono::Duration`.
pub const MAX_HEARTBEAT_TIMEOUT_SECS: u64 = i64::MAX as u64 / 1000;

/// Maximum length of a hostname (RFC 1035 limit for a full name).
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of an SSH public key line.
const MAX_SSH_PUBKEY_LEN: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Liveness status of a registered agent.
///
/// Agents are never deleted; a stale agent is flipped to `Offline` and
/// comes back `Online` with its next heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Online => "online",
            AgentStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Whether an agent last seen at `last_seen` is stale at `now`.
///
/// An agent exactly `timeout_secs` old is still considered live. A timeout
/// too large to represent never expires.
pub fn is_stale(last_seen: Timestamp, now: Timestamp, timeout_secs: u64) -> bool {
    let Some(timeout) = i64::try_from(timeout_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
    else {
        return false;
    };
    now - last_seen > timeout
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an agent hostname.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_HOSTNAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_hostname(hostname: &str) -> Result<(), CoreError> {
    if hostname.is_empty() {
        return Err(CoreError::Validation(
            "Hostname must not be empty".to_string(),
        ));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Hostname must not exceed {MAX_HOSTNAME_LEN} characters"
        )));
    }
    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Hostname may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate an optional IP address string. Empty means "not reported".
pub fn validate_ip(ip: &str) -> Result<(), CoreError> {
    if ip.is_empty() || ip.parse::<std::net::IpAddr>().is_ok() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Invalid IP address: '{ip}'")))
    }
}

/// Validate an optional SSH public key. Empty means "not provided".
pub fn validate_ssh_pubkey(key: &str) -> Result<(), CoreError> {
    if key.len() > MAX_SSH_PUBKEY_LEN {
        return Err(CoreError::Validation(format!(
            "SSH public key must not exceed {MAX_SSH_PUBKEY_LEN} bytes"
        )));
    }
    if key.contains('\n') {
        return Err(CoreError::Validation(
            "SSH public key must be a single line".to_string(),
        ));
    }
    Ok(())
}

/// Agent metadata must be a JSON object.
pub fn validate_meta(meta: &serde_json::Value) -> Result<(), CoreError> {
    if meta.is_object() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Agent meta must be a JSON object".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
