//! Route definitions for the agent registry.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::agents;
use crate::state::AppState;

/// Routes mounted at `/agents`.
///
/// ```text
/// POST  /                 -> register_agent   (public)
/// GET   /                 -> list_agents      (admin)
/// GET   /{id}             -> get_agent        (admin)
/// POST  /{id}/heartbeat   -> heartbeat        (admin or that agent)
/// GET   /{id}/jobs        -> agent_jobs       (admin or that agent)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(agents::list_agents).post(agents::register_agent))
        .route("/{id}", get(agents::get_agent))
        .route("/{id}/heartbeat", post(agents::heartbeat))
        .route("/{id}/jobs", get(agents::agent_jobs))
}
