pub mod agents;
pub mod envs;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the orchestrator route tree.
///
/// ```text
/// /agents                     register (public), list
/// /agents/{id}                get
/// /agents/{id}/heartbeat      heartbeat
/// /agents/{id}/jobs           running jobs for the agent
///
/// /jobs                       submit, list
/// /jobs/{id}                  get
/// /jobs/{id}/assign           pending -> running
/// /jobs/{id}/complete         running -> completed
/// /jobs/{id}/fail             running -> failed
///
/// /envs                       upload env bundle
/// /envs/{token}               download env bundle
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/agents", agents::router())
        .nest("/jobs", jobs::router())
        .nest("/envs", envs::router())
}
