//! Handlers for the job dispatcher.
//!
//! Admins submit, list, and assign jobs. The assigned agent (or an admin)
//! reports the outcome.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use orch_core::error::CoreError;
use orch_store::models::job::{AssignJob, CompleteJob, FailJob, JobListQuery, SubmitJob};
use orch_store::repositories::{EnvRepo, JobRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Caller, RequireAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /jobs
///
/// Validates the payload and any referenced env bundle, then creates a
/// `pending` job.
pub async fn submit_job(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    input.payload.validate()?;

    if let Some(token) = input.payload.env_token() {
        if !EnvRepo::exists(&state.store, token).await? {
            return Err(AppError::Core(CoreError::not_found("EnvBundle", token)));
        }
    }

    let job = JobRepo::submit(&state.store, input.payload).await?;

    tracing::info!(job_id = %job.id, "Job submitted");

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /jobs?status=&agent_id=
pub async fn list_jobs(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(filter): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list(&state.store, &filter).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /jobs/{id}
///
/// Agents may only read jobs assigned to them.
pub async fn get_job(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.store, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Job", &id)))?;

    if let Some(agent_id) = caller.acting_agent() {
        if job.agent_id.as_deref() != Some(agent_id) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Job is not assigned to this agent".into(),
            )));
        }
    }

    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// POST /jobs/{id}/assign
pub async fn assign_job(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AssignJob>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::assign(&state.store, &id, &input.agent_id).await?;

    tracing::info!(job_id = %job.id, agent_id = %input.agent_id, "Job assigned");

    Ok(Json(DataResponse { data: job }))
}

/// POST /jobs/{id}/complete
pub async fn complete_job(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CompleteJob>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::complete(&state.store, &id, input.result, caller.acting_agent()).await?;

    tracing::info!(
        job_id = %job.id,
        agent_id = job.agent_id.as_deref().unwrap_or_default(),
        "Job completed",
    );

    Ok(Json(DataResponse { data: job }))
}

/// POST /jobs/{id}/fail
pub async fn fail_job(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<FailJob>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::fail(&state.store, &id, input.reason, caller.acting_agent()).await?;

    tracing::warn!(
        job_id = %job.id,
        agent_id = job.agent_id.as_deref().unwrap_or_default(),
        reason = job.error.as_deref().unwrap_or_default(),
        "Job failed",
    );

    Ok(Json(DataResponse { data: job }))
}
