//! Repository for the `agents` collection.

use chrono::Utc;
use orch_core::agent::{self, AgentStatus};
use orch_core::error::CoreError;
use orch_core::types::{new_id, EntityId, Timestamp};

use crate::error::RepoError;
use crate::models::agent::{Agent, AgentRecord, AgentTable, CreateAgent};
use crate::{Store, AGENTS_KEY};

/// Registry operations over agents.
pub struct AgentRepo;

impl AgentRepo {
    // ── Registration ─────────────────────────────────────────────────────

    /// Register a new agent with a freshly issued id.
    ///
    /// The agent starts `online` with `last_seen_at = registered_at`. An id
    /// or token collision is rejected with [`CoreError::Conflict`].
    pub async fn register(
        store: &Store,
        input: &CreateAgent,
        token_hash: &str,
    ) -> Result<Agent, RepoError> {
        let txn = store.begin().await;
        let mut agents: AgentTable = txn.load(AGENTS_KEY).await?;

        let id = new_id();
        if agents.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Agent id {id} already issued")).into());
        }
        if agents.values().any(|r| r.token_hash == token_hash) {
            return Err(CoreError::Conflict("Agent token already issued".into()).into());
        }

        let now = Utc::now();
        let agent = Agent {
            id: id.clone(),
            hostname: input.hostname.clone(),
            ip: input.ip.clone().unwrap_or_default(),
            ssh_pubkey: input.ssh_pubkey.clone().unwrap_or_default(),
            meta: input
                .meta
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            status: AgentStatus::Online,
            registered_at: now,
            last_seen_at: now,
        };
        agents.insert(
            id,
            AgentRecord {
                agent: agent.clone(),
                token_hash: token_hash.to_string(),
            },
        );

        txn.save(AGENTS_KEY, &agents).await?;
        Ok(agent)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Find an agent by id.
    pub async fn find_by_id(store: &Store, id: &str) -> Result<Option<Agent>, RepoError> {
        let agents: AgentTable = store.read(AGENTS_KEY).await?;
        Ok(agents.get(id).map(|r| r.agent.clone()))
    }

    /// Find the agent holding the token with digest `token_hash`.
    pub async fn find_by_token_hash(
        store: &Store,
        token_hash: &str,
    ) -> Result<Option<Agent>, RepoError> {
        let agents: AgentTable = store.read(AGENTS_KEY).await?;
        Ok(agents
            .into_values()
            .find(|r| r.token_hash == token_hash)
            .map(|r| r.agent))
    }

    /// List all agents, oldest registration first.
    pub async fn list(store: &Store) -> Result<Vec<Agent>, RepoError> {
        let agents: AgentTable = store.read(AGENTS_KEY).await?;
        let mut list: Vec<Agent> = agents.into_values().map(|r| r.agent).collect();
        list.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(list)
    }

    // ── Liveness ─────────────────────────────────────────────────────────

    /// Record a heartbeat: bump `last_seen_at` and bring the agent online.
    ///
    /// Returns `None` if the agent is unknown.
    pub async fn heartbeat(store: &Store, id: &str) -> Result<Option<Agent>, RepoError> {
        let txn = store.begin().await;
        let mut agents: AgentTable = txn.load(AGENTS_KEY).await?;

        let Some(record) = agents.get_mut(id) else {
            return Ok(None);
        };
        record.agent.last_seen_at = Utc::now();
        record.agent.status = AgentStatus::Online;
        let agent = record.agent.clone();

        txn.save(AGENTS_KEY, &agents).await?;
        Ok(Some(agent))
    }

    /// Flip every online agent not seen within `timeout_secs` of `now` to
    /// offline. Returns the ids that changed.
    pub async fn mark_stale_offline(
        store: &Store,
        now: Timestamp,
        timeout_secs: u64,
    ) -> Result<Vec<EntityId>, RepoError> {
        let txn = store.begin().await;
        let mut agents: AgentTable = txn.load(AGENTS_KEY).await?;

        let mut flipped = Vec::new();
        for record in agents.values_mut() {
            if record.agent.status == AgentStatus::Online
                && agent::is_stale(record.agent.last_seen_at, now, timeout_secs)
            {
                record.agent.status = AgentStatus::Offline;
                flipped.push(record.agent.id.clone());
            }
        }

        if !flipped.is_empty() {
            txn.save(AGENTS_KEY, &agents).await?;
        }
        Ok(flipped)
    }
}
