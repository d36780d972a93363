//! Handlers for the agent registry.
//!
//! Provides:
//! - Public self-registration (returns the one-time agent token).
//! - Admin listing and lookup.
//! - Heartbeat and work-queue polling for agents.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use orch_core::agent;
use orch_core::credentials::generate_agent_token;
use orch_core::error::CoreError;
use orch_store::models::agent::{Agent, CreateAgent, RegisteredAgent};
use orch_store::repositories::{AgentRepo, JobRepo};
use orch_store::Store;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Caller, RequireAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that an agent exists, returning it.
async fn ensure_agent_exists(store: &Store, id: &str) -> AppResult<Agent> {
    AgentRepo::find_by_id(store, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Agent", id)))
}

/// Validate registration input.
fn validate_create_input(input: &CreateAgent) -> AppResult<()> {
    agent::validate_hostname(&input.hostname)?;
    if let Some(ref ip) = input.ip {
        agent::validate_ip(ip)?;
    }
    if let Some(ref key) = input.ssh_pubkey {
        agent::validate_ssh_pubkey(key)?;
    }
    if let Some(ref meta) = input.meta {
        agent::validate_meta(meta)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// POST /agents  (self-registration -- no auth)
// ---------------------------------------------------------------------------

/// Register a new agent and hand back its token.
pub async fn register_agent(
    State(state): State<AppState>,
    Json(input): Json<CreateAgent>,
) -> AppResult<impl IntoResponse> {
    validate_create_input(&input)?;

    let token = generate_agent_token();
    let agent = AgentRepo::register(&state.store, &input, &token.hash).await?;

    tracing::info!(
        agent_id = %agent.id,
        hostname = %agent.hostname,
        "Agent registered",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: RegisteredAgent {
                agent,
                agent_token: token.plaintext,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /agents
// ---------------------------------------------------------------------------

/// List all agents.
pub async fn list_agents(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let agents = AgentRepo::list(&state.store).await?;
    Ok(Json(DataResponse { data: agents }))
}

// ---------------------------------------------------------------------------
// GET /agents/{id}
// ---------------------------------------------------------------------------

/// Get a single agent by ID.
pub async fn get_agent(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let agent = ensure_agent_exists(&state.store, &id).await?;
    Ok(Json(DataResponse { data: agent }))
}

// ---------------------------------------------------------------------------
// POST /agents/{id}/heartbeat
// ---------------------------------------------------------------------------

/// Record a liveness signal.
pub async fn heartbeat(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    caller.ensure_agent(&id)?;

    let agent = AgentRepo::heartbeat(&state.store, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Agent", &id)))?;

    tracing::debug!(agent_id = %agent.id, "Agent heartbeat");
    Ok(Json(DataResponse { data: agent }))
}

// ---------------------------------------------------------------------------
// GET /agents/{id}/jobs
// ---------------------------------------------------------------------------

/// The agent's work queue: jobs assigned to it and still running.
///
/// When the agent itself polls, the poll also counts as a heartbeat.
pub async fn agent_jobs(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    caller.ensure_agent(&id)?;

    if caller.acting_agent().is_some() {
        AgentRepo::heartbeat(&state.store, &id).await?;
    } else {
        ensure_agent_exists(&state.store, &id).await?;
    }

    let jobs = JobRepo::running_for_agent(&state.store, &id).await?;
    Ok(Json(DataResponse { data: jobs }))
}
