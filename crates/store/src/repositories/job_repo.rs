//! Repository for the `jobs` collection: submission and the dispatch
//! lifecycle.
//!
//! Every transition loads, checks, and saves inside one [`Txn`](crate::Txn),
//! so two callers racing on the same job cannot both succeed.

use chrono::Utc;
use orch_core::agent::AgentStatus;
use orch_core::dispatch::{self, JobStatus};
use orch_core::error::CoreError;
use orch_core::payload::JobPayload;
use orch_core::types::new_id;

use crate::error::RepoError;
use crate::models::agent::AgentTable;
use crate::models::job::{Job, JobListQuery, JobTable};
use crate::{Store, AGENTS_KEY, JOBS_KEY};

/// Dispatcher operations over jobs.
pub struct JobRepo;

impl JobRepo {
    // ── Submission ───────────────────────────────────────────────────────

    /// Create a new `pending` job. The payload must already be validated.
    pub async fn submit(store: &Store, payload: JobPayload) -> Result<Job, RepoError> {
        let txn = store.begin().await;
        let mut jobs: JobTable = txn.load(JOBS_KEY).await?;

        let id = new_id();
        if jobs.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Job id {id} already issued")).into());
        }

        let now = Utc::now();
        let job = Job {
            id: id.clone(),
            agent_id: None,
            status: JobStatus::Pending,
            payload,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        };
        jobs.insert(id, job.clone());

        txn.save(JOBS_KEY, &jobs).await?;
        Ok(job)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Find a job by id.
    pub async fn find_by_id(store: &Store, id: &str) -> Result<Option<Job>, RepoError> {
        let jobs: JobTable = store.read(JOBS_KEY).await?;
        Ok(jobs.get(id).cloned())
    }

    /// List jobs matching `filter`, oldest first.
    pub async fn list(store: &Store, filter: &JobListQuery) -> Result<Vec<Job>, RepoError> {
        let jobs: JobTable = store.read(JOBS_KEY).await?;
        let mut list: Vec<Job> = jobs.into_values().filter(|j| filter.matches(j)).collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    /// Running jobs assigned to `agent_id`: the agent's work queue.
    pub async fn running_for_agent(store: &Store, agent_id: &str) -> Result<Vec<Job>, RepoError> {
        let filter = JobListQuery {
            status: Some(JobStatus::Running),
            agent_id: Some(agent_id.to_string()),
        };
        Self::list(store, &filter).await
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Assign a pending job to an agent, moving it to `running`.
    ///
    /// Checks, in order: the job exists (`NotFound`), the job is pending
    /// (`Conflict`), the agent exists (`NotFound`), the agent is online
    /// (`Conflict`).
    pub async fn assign(store: &Store, job_id: &str, agent_id: &str) -> Result<Job, RepoError> {
        let txn = store.begin().await;
        let mut jobs: JobTable = txn.load(JOBS_KEY).await?;
        let agents: AgentTable = txn.load(AGENTS_KEY).await?;

        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| CoreError::not_found("Job", job_id))?;
        dispatch::check_assignable(job_id, job.status)?;

        let agent = agents
            .get(agent_id)
            .ok_or_else(|| CoreError::not_found("Agent", agent_id))?;
        if agent.agent.status != AgentStatus::Online {
            return Err(CoreError::Conflict(format!("Agent {agent_id} is offline")).into());
        }

        let now = Utc::now();
        job.agent_id = Some(agent_id.to_string());
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.updated_at = now;
        let job = job.clone();

        txn.save(JOBS_KEY, &jobs).await?;
        Ok(job)
    }

    /// Mark a running job `completed` with `result`.
    pub async fn complete(
        store: &Store,
        job_id: &str,
        result: String,
        acting_agent: Option<&str>,
    ) -> Result<Job, RepoError> {
        Self::finish(store, job_id, JobStatus::Completed, result, acting_agent).await
    }

    /// Mark a running job `failed` with `reason`.
    pub async fn fail(
        store: &Store,
        job_id: &str,
        reason: String,
        acting_agent: Option<&str>,
    ) -> Result<Job, RepoError> {
        Self::finish(store, job_id, JobStatus::Failed, reason, acting_agent).await
    }

    /// Move a running job into a terminal status.
    ///
    /// When `acting_agent` is set, only the assigned agent may finish the
    /// job (`Forbidden` otherwise).
    async fn finish(
        store: &Store,
        job_id: &str,
        outcome: JobStatus,
        detail: String,
        acting_agent: Option<&str>,
    ) -> Result<Job, RepoError> {
        let txn = store.begin().await;
        let mut jobs: JobTable = txn.load(JOBS_KEY).await?;

        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| CoreError::not_found("Job", job_id))?;

        if let Some(actor) = acting_agent {
            if job.agent_id.as_deref() != Some(actor) {
                return Err(CoreError::Forbidden(format!(
                    "Job {job_id} is not assigned to this agent"
                ))
                .into());
            }
        }
        dispatch::check_finishable(job_id, job.status, outcome)?;

        let now = Utc::now();
        job.status = outcome;
        match outcome {
            JobStatus::Completed => job.result = Some(detail),
            _ => job.error = Some(detail),
        }
        job.finished_at = Some(now);
        job.updated_at = now;
        let job = job.clone();

        txn.save(JOBS_KEY, &jobs).await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;
    use crate::backend::MemoryStore;
    use crate::models::agent::CreateAgent;
    use crate::repositories::AgentRepo;
    use crate::{init_collections, StorePool};

    async fn test_store() -> StorePool {
        let store = Store::new(Arc::new(MemoryStore::new()));
        init_collections(&store).await.unwrap();
        store
    }

    async fn online_agent(store: &Store, token_hash: &str) -> String {
        let input = CreateAgent {
            hostname: "vps-1".into(),
            ip: None,
            ssh_pubkey: None,
            meta: None,
        };
        AgentRepo::register(store, &input, token_hash).await.unwrap().id
    }

    fn command() -> JobPayload {
        JobPayload::Command {
            args: vec!["deploy".into(), "https://example.com/acme/app.git".into()],
            env_token: None,
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_job() {
        let store = test_store().await;
        let job = JobRepo::submit(&store, command()).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.agent_id.is_none());
        let found = JobRepo::find_by_id(&store, &job.id).await.unwrap();
        assert_eq!(found, Some(job));
    }

    #[tokio::test]
    async fn full_lifecycle_completes_with_result() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        let job = JobRepo::submit(&store, command()).await.unwrap();

        let running = JobRepo::assign(&store, &job.id, &agent).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert_eq!(running.agent_id.as_deref(), Some(agent.as_str()));
        assert!(running.started_at.is_some());

        let done = JobRepo::complete(&store, &job.id, "ok".into(), Some(agent.as_str()))
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("ok"));

        let stored = JobRepo::find_by_id(&store, &job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.result.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn assign_unknown_job_is_not_found() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        assert_matches!(
            JobRepo::assign(&store, "missing", &agent).await,
            Err(RepoError::Core(CoreError::NotFound { entity: "Job", .. }))
        );
    }

    #[tokio::test]
    async fn assign_unknown_agent_is_not_found() {
        let store = test_store().await;
        let job = JobRepo::submit(&store, command()).await.unwrap();
        assert_matches!(
            JobRepo::assign(&store, &job.id, "ghost").await,
            Err(RepoError::Core(CoreError::NotFound { entity: "Agent", .. }))
        );
        let stored = JobRepo::find_by_id(&store, &job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn assign_non_pending_job_conflicts() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        let job = JobRepo::submit(&store, command()).await.unwrap();
        JobRepo::assign(&store, &job.id, &agent).await.unwrap();

        // Running.
        assert_matches!(
            JobRepo::assign(&store, &job.id, &agent).await,
            Err(RepoError::Core(CoreError::Conflict(_)))
        );
        // Even with an unknown agent, status is checked first.
        assert_matches!(
            JobRepo::assign(&store, &job.id, "ghost").await,
            Err(RepoError::Core(CoreError::Conflict(_)))
        );

        // Terminal.
        JobRepo::fail(&store, &job.id, "boom".into(), None).await.unwrap();
        assert_matches!(
            JobRepo::assign(&store, &job.id, &agent).await,
            Err(RepoError::Core(CoreError::Conflict(_)))
        );
    }

    #[tokio::test]
    async fn assign_to_offline_agent_conflicts() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        AgentRepo::mark_stale_offline(&store, Utc::now() + Duration::seconds(3600), 120)
            .await
            .unwrap();
        let job = JobRepo::submit(&store, command()).await.unwrap();

        assert_matches!(
            JobRepo::assign(&store, &job.id, &agent).await,
            Err(RepoError::Core(CoreError::Conflict(_)))
        );
    }

    #[tokio::test]
    async fn finishing_pending_job_is_invalid_state() {
        let store = test_store().await;
        let job = JobRepo::submit(&store, command()).await.unwrap();
        assert_matches!(
            JobRepo::complete(&store, &job.id, "ok".into(), None).await,
            Err(RepoError::Core(CoreError::InvalidState(_)))
        );
        assert_matches!(
            JobRepo::fail(&store, &job.id, "x".into(), None).await,
            Err(RepoError::Core(CoreError::InvalidState(_)))
        );
    }

    #[tokio::test]
    async fn terminal_jobs_reject_further_transitions() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        let job = JobRepo::submit(&store, command()).await.unwrap();
        JobRepo::assign(&store, &job.id, &agent).await.unwrap();
        JobRepo::complete(&store, &job.id, "ok".into(), None).await.unwrap();

        assert_matches!(
            JobRepo::complete(&store, &job.id, "again".into(), None).await,
            Err(RepoError::Core(CoreError::InvalidState(_)))
        );
        assert_matches!(
            JobRepo::fail(&store, &job.id, "late".into(), None).await,
            Err(RepoError::Core(CoreError::InvalidState(_)))
        );

        let stored = JobRepo::find_by_id(&store, &job.id).await.unwrap().unwrap();
        assert_eq!(stored.result.as_deref(), Some("ok"));
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn other_agent_cannot_finish_job() {
        let store = test_store().await;
        let owner = online_agent(&store, "a").await;
        let intruder = online_agent(&store, "b").await;
        let job = JobRepo::submit(&store, command()).await.unwrap();
        JobRepo::assign(&store, &job.id, &owner).await.unwrap();

        assert_matches!(
            JobRepo::complete(&store, &job.id, "ok".into(), Some(intruder.as_str())).await,
            Err(RepoError::Core(CoreError::Forbidden(_)))
        );
    }

    #[tokio::test]
    async fn list_filters_by_status_and_agent() {
        let store = test_store().await;
        let agent = online_agent(&store, "a").await;
        let first = JobRepo::submit(&store, command()).await.unwrap();
        let second = JobRepo::submit(&store, command()).await.unwrap();
        JobRepo::assign(&store, &second.id, &agent).await.unwrap();

        let pending = JobRepo::list(
            &store,
            &JobListQuery {
                status: Some(JobStatus::Pending),
                agent_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);

        let queue = JobRepo::running_for_agent(&store, &agent).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, second.id);

        let all = JobRepo::list(&store, &JobListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn racing_assignments_only_one_wins() {
        let store = test_store().await;
        let a = online_agent(&store, "a").await;
        let b = online_agent(&store, "b").await;
        let job = JobRepo::submit(&store, command()).await.unwrap();

        let (ra, rb) = tokio::join!(
            JobRepo::assign(&store, &job.id, &a),
            JobRepo::assign(&store, &job.id, &b)
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    }
}
