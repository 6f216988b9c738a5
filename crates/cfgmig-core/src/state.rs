//! Migration task lifecycle
//!
//! `NotStarted → Running → {Skipped, Success, Failed}`. Terminal states
//! have no outgoing transitions, which is what makes a task single-use.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Lifecycle state of a migration task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Created, not yet run
    NotStarted,
    /// Reading, reconciling or submitting
    Running,
    /// Nothing to do
    Skipped,
    /// Batch accepted
    Success,
    /// Store read or submission failed
    Failed,
}

impl TaskState {
    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Skipped => "SKIPPED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task state transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// State the task was in
    pub from: TaskState,
    /// State that was requested
    pub to: TaskState,
}

/// Validate a state transition
///
/// # Errors
/// Returns [`IllegalTransition`] for any transition outside the lifecycle
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: TaskState) -> &'static [TaskState] {
    use TaskState::{Failed, NotStarted, Running, Skipped, Success};
    match from {
        NotStarted => &[Running],
        Running => &[Skipped, Success, Failed],
        Skipped | Success | Failed => &[],
    }
}
