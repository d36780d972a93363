//! Domain rules for the orchestrator: identifiers, error kinds, the job
//! state machine, payload validation and credential helpers.
//!
//! Nothing in here performs I/O; persistence lives in `orch-store`.

pub mod agent;
pub mod credentials;
pub mod dispatch;
pub mod env_bundle;
pub mod error;
pub mod payload;
pub mod types;
