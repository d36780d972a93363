//! Route definitions for env bundles.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::envs;
use crate::state::AppState;

/// Routes mounted at `/envs`.
///
/// ```text
/// POST  /          -> upload_env    (admin)
/// GET   /{token}   -> download_env  (admin or agent with a referencing running job)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(envs::upload_env))
        .route("/{token}", get(envs::download_env))
}
