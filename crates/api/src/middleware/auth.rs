//! Caller authentication extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use orch_core::credentials::{hash_token, secrets_match};
use orch_core::error::CoreError;
use orch_store::models::agent::Agent;
use orch_store::repositories::AgentRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the token an agent received at registration.
pub const AGENT_TOKEN_HEADER: &str = "x-agent-token";

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Admin gate.
///
/// When `ADMIN_API_TOKEN` is configured, requires
/// `Authorization: Bearer <token>` to match it; otherwise every request
/// passes.
///
/// ```ignore
/// async fn list(_admin: RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(RequireAdmin);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            unauthorized("Invalid Authorization format. Expected: Bearer <token>")
        })?;

        if !secrets_match(token.trim(), expected) {
            return Err(unauthorized("Invalid admin token"));
        }
        Ok(RequireAdmin)
    }
}

/// A registered agent identified by its `X-Agent-Token` header.
#[derive(Debug, Clone)]
pub struct AuthAgent(pub Agent);

impl FromRequestParts<AppState> for AuthAgent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AGENT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unauthorized("Missing agent token"))?;

        let agent = AgentRepo::find_by_token_hash(&state.store, &hash_token(token))
            .await?
            .ok_or_else(|| unauthorized("Invalid agent token"))?;

        Ok(AuthAgent(agent))
    }
}

/// Either an admin or an agent, for endpoints both may call.
///
/// A request carrying `X-Agent-Token` is always treated as the agent it
/// names; anything else must pass the admin gate.
#[derive(Debug, Clone)]
pub enum Caller {
    Admin,
    Agent(Agent),
}

impl Caller {
    /// The agent id when the caller is an agent.
    pub fn acting_agent(&self) -> Option<&str> {
        match self {
            Caller::Admin => None,
            Caller::Agent(agent) => Some(&agent.id),
        }
    }

    /// Admins may act for any agent; an agent only for itself.
    pub fn ensure_agent(&self, agent_id: &str) -> Result<(), AppError> {
        match self.acting_agent() {
            Some(own) if own != agent_id => Err(AppError::Core(CoreError::Forbidden(
                "Agents may only act on their own resources".into(),
            ))),
            _ => Ok(()),
        }
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(AGENT_TOKEN_HEADER) {
            let AuthAgent(agent) = AuthAgent::from_request_parts(parts, state).await?;
            return Ok(Caller::Agent(agent));
        }
        RequireAdmin::from_request_parts(parts, state).await?;
        Ok(Caller::Admin)
    }
}
