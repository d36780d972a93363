//! Periodic sweep that flips silent agents offline.
//!
//! Runs on a fixed interval using `tokio::time::interval`. Agents come back
//! online on their next heartbeat; nothing is ever deleted.

use std::time::Duration;

use chrono::Utc;
use orch_store::repositories::AgentRepo;
use orch_store::StorePool;
use tokio_util::sync::CancellationToken;

/// Run the stale-agent sweep until `cancel` is triggered.
pub async fn run(
    store: StorePool,
    timeout_secs: u64,
    check_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        timeout_secs,
        interval_secs = check_interval.as_secs(),
        "Heartbeat monitor started"
    );

    let mut interval = tokio::time::interval(check_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Heartbeat monitor stopping");
                break;
            }
            _ = interval.tick() => {
                match AgentRepo::mark_stale_offline(&store, Utc::now(), timeout_secs).await {
                    Ok(flipped) if !flipped.is_empty() => {
                        tracing::warn!(count = flipped.len(), agents = ?flipped, "Agents marked offline");
                    }
                    Ok(_) => {
                        tracing::debug!("Heartbeat monitor: all agents live");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Heartbeat monitor: sweep failed");
                    }
                }
            }
        }
    }
}
