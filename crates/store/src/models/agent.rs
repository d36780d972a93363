//! Agent records and DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use orch_core::agent::AgentStatus;
use orch_core::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Entity structs
// ---------------------------------------------------------------------------

/// A registered agent, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: EntityId,
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ssh_pubkey: String,
    #[serde(default = "empty_object")]
    pub meta: serde_json::Value,
    pub status: AgentStatus,
    pub registered_at: Timestamp,
    pub last_seen_at: Timestamp,
}

/// An agent as persisted in the `agents` collection.
///
/// Carries the token digest, which never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(flatten)]
    pub agent: Agent,
    pub token_hash: String,
}

/// The `agents` collection, keyed by agent id.
pub type AgentTable = BTreeMap<EntityId, AgentRecord>;

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for agent self-registration.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgent {
    pub hostname: String,
    pub ip: Option<String>,
    pub ssh_pubkey: Option<String>,
    pub meta: Option<serde_json::Value>,
}

/// Registration response. `agent_token` is shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredAgent {
    pub agent: Agent,
    pub agent_token: String,
}
