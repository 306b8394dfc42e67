use std::sync::Arc;

use lpgen_core::job::{current_step_index, overall_progress};
use lpgen_core::{GenerationResult, JobId, JobSnapshot, Step};
use lpgen_preview::Preview;

use crate::state::GenerationState;

/// Everything an observer needs to display one generation.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: GenerationState,
    pub job_id: Option<JobId>,
    /// Most recent snapshot received for the current job.
    pub snapshot: Option<JobSnapshot>,
    /// Steps reconciled across snapshots; all pending before the first.
    pub steps: Vec<Step>,
    pub result: Option<GenerationResult>,
    /// At most one preview exists; a new completion replaces it.
    pub preview: Option<Arc<Preview>>,
    /// User-facing message while in [`GenerationState::Error`].
    pub error: Option<String>,
    /// Bumped whenever the current job is discarded or replaced.
    pub epoch: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: GenerationState::Idle,
            job_id: None,
            snapshot: None,
            steps: Step::initial_sequence(),
            result: None,
            preview: None,
            error: None,
            epoch: 0,
        }
    }
}

impl Session {
    /// Overall progress, 0-100. Uses the server's figure when a snapshot
    /// carries one, otherwise derives it from the steps.
    pub fn progress(&self) -> f32 {
        match &self.snapshot {
            Some(snapshot) if snapshot.progress > 0.0 => snapshot.progress_percent(),
            _ => overall_progress(&self.steps),
        }
    }

    /// Index into [`steps`](Self::steps) of the step being worked on.
    pub fn current_step_index(&self) -> usize {
        current_step_index(&self.steps)
    }

    /// The step being worked on, if any remain.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index())
    }

    /// Completed, but the backend sent no generated bundle.
    pub fn is_missing_result(&self) -> bool {
        self.state == GenerationState::Completed && self.result.is_none()
    }

    /// Discard the current job, keeping only the epoch counter.
    pub(crate) fn clear(&mut self) {
        *self = Self {
            epoch: self.epoch + 1,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use lpgen_core::{JobStatus, StepStatus};

    use super::*;

    #[test]
    fn fresh_session_is_idle_with_pending_steps() {
        let session = Session::default();
        assert_eq!(session.state, GenerationState::Idle);
        assert_eq!(session.steps.len(), 5);
        assert_eq!(session.progress(), 0.0);
        assert_eq!(session.current_step_index(), 0);
    }

    #[test]
    fn progress_prefers_server_figure() {
        let mut session = Session::default();
        session.steps[0].status = StepStatus::Completed;
        assert_eq!(session.progress(), 20.0);

        session.snapshot = Some(JobSnapshot {
            job_id: "j".into(),
            status: JobStatus::Processing,
            progress: 35.0,
            current_step: "css".into(),
            steps: vec![],
            error: None,
            result: None,
        });
        assert_eq!(session.progress(), 35.0);
    }

    #[test]
    fn clear_bumps_epoch_and_drops_job() {
        let mut session = Session {
            state: GenerationState::Error,
            job_id: Some("j".into()),
            error: Some("boom".into()),
            epoch: 3,
            ..Session::default()
        };
        session.clear();
        assert_eq!(session.state, GenerationState::Idle);
        assert_eq!(session.job_id, None);
        assert_eq!(session.error, None);
        assert_eq!(session.epoch, 4);
    }
}
