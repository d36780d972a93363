//! Handlers for env bundles.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use orch_core::env_bundle::{validate_env_bundle, validate_env_token};
use orch_core::error::CoreError;
use orch_store::repositories::{EnvRepo, JobRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Caller, RequireAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

/// Response to a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadedEnv {
    pub env_token: String,
}

/// POST /envs
///
/// The body is the bundle itself: a JSON object of variables.
pub async fn upload_env(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(env): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    validate_env_bundle(&env)?;

    let env_token = EnvRepo::create(&state.store, &env).await?;

    tracing::info!(
        vars = env.as_object().map_or(0, |o| o.len()),
        "Env bundle uploaded",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadedEnv { env_token },
        }),
    ))
}

/// GET /envs/{token}
///
/// An agent may only download a bundle referenced by a job currently
/// running on it.
pub async fn download_env(
    caller: Caller,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    validate_env_token(&token)?;

    if let Some(agent_id) = caller.acting_agent() {
        let referenced = JobRepo::running_for_agent(&state.store, agent_id)
            .await?
            .iter()
            .any(|job| job.payload.env_token() == Some(token.as_str()));
        if !referenced {
            tracing::warn!(agent_id, "Env download refused: no running job references it");
            return Err(AppError::Core(CoreError::Forbidden(
                "No running job for this agent references this env token".into(),
            )));
        }
    }

    let env = EnvRepo::find(&state.store, &token)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("EnvBundle", &token)))?;

    Ok(Json(DataResponse { data: env }))
}
