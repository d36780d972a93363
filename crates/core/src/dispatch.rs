//! Job lifecycle state machine.
//!
//! ```text
//! pending ──assign──▶ running ──complete──▶ completed
//!                        └──────fail──────▶ failed
//! ```
//!
//! `completed` and `failed` are terminal. No transition ever moves a job
//! backwards.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Execution status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward step.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a job in `current` may be assigned to an agent.
///
/// Anything other than `pending` is a [`CoreError::Conflict`].
pub fn check_assignable(job_id: &str, current: JobStatus) -> Result<(), CoreError> {
    if current.can_transition_to(JobStatus::Running) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Job {job_id} is {current}, only pending jobs can be assigned"
        )))
    }
}

/// Check that a job in `current` may finish with `outcome`
/// (`Completed` or `Failed`).
///
/// Anything other than `running` is a [`CoreError::InvalidState`].
pub fn check_finishable(
    job_id: &str,
    current: JobStatus,
    outcome: JobStatus,
) -> Result<(), CoreError> {
    if !outcome.is_terminal() {
        return Err(CoreError::Internal(format!(
            "{outcome} is not a terminal job status"
        )));
    }
    if current.can_transition_to(outcome) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Job {job_id} is {current}, only running jobs can be marked {outcome}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    fn rank(s: JobStatus) -> u8 {
        match s {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    #[test]
    fn transitions_only_move_forward() {
        for from in ALL {
            for to in ALL {
                if from.can_transition_to(to) {
                    assert!(rank(to) > rank(from), "{from} -> {to} moves backwards");
                }
            }
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for from in [JobStatus::Completed, JobStatus::Failed] {
            for to in ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn only_pending_is_assignable() {
        assert!(check_assignable("j", JobStatus::Pending).is_ok());
        for s in [JobStatus::Running, JobStatus::Completed, JobStatus::Failed] {
            assert_matches!(check_assignable("j", s), Err(CoreError::Conflict(_)));
        }
    }

    #[test]
    fn only_running_is_finishable() {
        assert!(check_finishable("j", JobStatus::Running, JobStatus::Completed).is_ok());
        assert!(check_finishable("j", JobStatus::Running, JobStatus::Failed).is_ok());
        assert_matches!(
            check_finishable("j", JobStatus::Pending, JobStatus::Completed),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            check_finishable("j", JobStatus::Completed, JobStatus::Failed),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn finishing_into_non_terminal_is_internal_error() {
        assert_matches!(
            check_finishable("j", JobStatus::Pending, JobStatus::Running),
            Err(CoreError::Internal(_))
        );
    }
}
