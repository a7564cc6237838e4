//! Run identity, cancellation and outcome.

use crate::error::{FailureKind, PipelineError, Result};
use crate::types::SolutionResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to one run: an id plus its cancellation flag.
///
/// Clones share the flag, so the orchestrator can cancel a run while the
/// run's own task holds another clone.
///
/// # Example
///
/// ```
/// use screen_solve::run::RunHandle;
///
/// let handle = RunHandle::new(1);
/// let seen_by_task = handle.clone();
/// handle.cancel();
/// assert!(seen_by_task.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: u64,
    cancel: Arc<AtomicBool>,
}

impl RunHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Return an error if cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// The flag itself, for passing into provider calls.
    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Extracting,
    Solving,
    Succeeded,
    Failed,
    /// Ended before any provider call because there was nothing to process.
    NoScreenshots,
    Cancelled,
}

impl RunState {
    /// Whether the run has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded
                | RunState::Failed
                | RunState::NoScreenshots
                | RunState::Cancelled
        )
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Succeeded(SolutionResult),
    Failed { kind: FailureKind, message: String },
    NoScreenshots,
    Cancelled,
}

impl RunOutcome {
    /// Classify a run-ending error.
    pub fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::Cancelled => RunOutcome::Cancelled,
            PipelineError::NoScreenshots => RunOutcome::NoScreenshots,
            other => RunOutcome::Failed {
                kind: other.kind(),
                message: other.user_message(),
            },
        }
    }

    /// The state a run is left in.
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Succeeded(_) => RunState::Succeeded,
            RunOutcome::Failed { .. } => RunState::Failed,
            RunOutcome::NoScreenshots => RunState::NoScreenshots,
            RunOutcome::Cancelled => RunState::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let handle = RunHandle::new(7);
        let clone = handle.clone();
        assert_ok!(clone.check_cancelled());

        handle.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.cancel_flag().load(Ordering::Relaxed));
        let err = assert_err!(clone.check_cancelled());
        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(clone.id(), 7);
    }

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            RunOutcome::from_error(&PipelineError::Cancelled),
            RunOutcome::Cancelled
        );
        assert_eq!(
            RunOutcome::from_error(&PipelineError::NoScreenshots).state(),
            RunState::NoScreenshots
        );

        let outcome = RunOutcome::from_error(&PipelineError::ProviderUnavailable("no key".into()));
        match outcome {
            RunOutcome::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::ProviderUnavailable);
                assert!(message.contains("API key"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Solving.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
        assert!(RunState::NoScreenshots.is_terminal());
    }
}
