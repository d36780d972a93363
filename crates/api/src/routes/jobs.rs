//! Route definitions for the job dispatcher.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST  /                -> submit_job    (admin)
/// GET   /                -> list_jobs     (admin)
/// GET   /{id}            -> get_job       (admin or assigned agent)
/// POST  /{id}/assign     -> assign_job    (admin)
/// POST  /{id}/complete   -> complete_job  (admin or assigned agent)
/// POST  /{id}/fail       -> fail_job      (admin or assigned agent)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/assign", post(jobs::assign_job))
        .route("/{id}/complete", post(jobs::complete_job))
        .route("/{id}/fail", post(jobs::fail_job))
}
