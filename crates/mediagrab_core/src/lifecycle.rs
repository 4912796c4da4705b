use thiserror::Error;

use crate::JobOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Starting,
    Running,
    Succeeded,
    Skipped,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Skipped | JobState::Cancelled | JobState::Failed
        )
    }
}

impl From<&JobOutcome> for JobState {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Succeeded(_) => JobState::Succeeded,
            JobOutcome::Skipped(_) => JobState::Skipped,
            JobOutcome::Cancelled => JobState::Cancelled,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid job transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// Tracks a job through `Idle -> Starting -> Running -> terminal`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobLifecycle {
    state: JobState,
}

impl JobLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, to: JobState) -> Result<JobState, TransitionError> {
        use JobState::*;
        let allowed = matches!(
            (self.state, to),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Skipped)
                | (Starting, Cancelled)
                | (Starting, Failed)
                | (Running, Succeeded)
                | (Running, Cancelled)
                | (Running, Failed)
        );
        if !allowed {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(to)
    }

    /// Moves into the terminal state matching `outcome`.
    pub fn finish(&mut self, outcome: &JobOutcome) -> Result<JobState, TransitionError> {
        self.advance(JobState::from(outcome))
    }
}
