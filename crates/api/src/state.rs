use std::sync::Arc;

use orch_store::StorePool;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: both fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Agent/job state store.
    pub store: StorePool,
    /// Server configuration (admin token, heartbeat settings).
    pub config: Arc<ServerConfig>,
}
