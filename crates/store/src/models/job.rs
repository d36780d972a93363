//! Job records and DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use orch_core::dispatch::JobStatus;
use orch_core::payload::JobPayload;
use orch_core::types::{EntityId, Timestamp};

/// A job in the `jobs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: EntityId,
    /// Agent the job was assigned to. Set once, at assignment.
    pub agent_id: Option<EntityId>,
    pub status: JobStatus,
    pub payload: JobPayload,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// The `jobs` collection, keyed by job id.
pub type JobTable = BTreeMap<EntityId, Job>;

/// DTO for submitting a job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJob {
    pub payload: JobPayload,
}

/// DTO for assigning a pending job.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignJob {
    pub agent_id: EntityId,
}

/// DTO for completing a running job.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteJob {
    #[serde(default)]
    pub result: String,
}

/// DTO for failing a running job.
#[derive(Debug, Clone, Deserialize)]
pub struct FailJob {
    #[serde(default)]
    pub reason: String,
}

/// Filters for listing jobs (`?status=&agent_id=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub agent_id: Option<EntityId>,
}

impl JobListQuery {
    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| s == job.status)
            && self
                .agent_id
                .as_deref()
                .is_none_or(|a| job.agent_id.as_deref() == Some(a))
    }
}
