//! TaskRunState - 1 回の実行（task run）の状態

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of one task run.
///
/// State transitions within a single attempt:
/// - Pending -> Running -> Success
/// - Pending -> Running -> Failed
///
/// Only `Pending` is accepted by the dispatcher. Nothing ever moves back to
/// `Pending` or `Running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRunState {
    /// Created by the scheduler, eligible for execution.
    #[default]
    Pending,

    /// An execution attempt is in progress.
    Running,

    /// The work function finished successfully.
    Success,

    /// The work function reported failure, errored, or could not be dispatched.
    Failed,
}

impl TaskRunState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskRunState::Success | TaskRunState::Failed)
    }

    /// Can a run in this state be handed to the dispatcher?
    pub fn is_submittable(self) -> bool {
        matches!(self, TaskRunState::Pending)
    }

    /// Whether `self -> next` is a legal move for one attempt.
    pub fn can_transition_to(self, next: TaskRunState) -> bool {
        match (self, next) {
            (TaskRunState::Pending, TaskRunState::Running) => true,
            (TaskRunState::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskRunState::Pending => "PENDING",
            TaskRunState::Running => "RUNNING",
            TaskRunState::Success => "SUCCESS",
            TaskRunState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn state_serializes_as_upper_case_names() {
        let s = serde_json::to_string(&TaskRunState::Running).unwrap();
        assert_eq!(s, "\"RUNNING\"");

        let back: TaskRunState = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, TaskRunState::Failed);
    }

    #[rstest]
    #[case(TaskRunState::Pending, TaskRunState::Running, true)]
    #[case(TaskRunState::Running, TaskRunState::Success, true)]
    #[case(TaskRunState::Running, TaskRunState::Failed, true)]
    #[case(TaskRunState::Pending, TaskRunState::Success, false)]
    #[case(TaskRunState::Running, TaskRunState::Pending, false)]
    #[case(TaskRunState::Running, TaskRunState::Running, false)]
    #[case(TaskRunState::Success, TaskRunState::Failed, false)]
    #[case(TaskRunState::Failed, TaskRunState::Running, false)]
    fn transitions_are_one_directional(
        #[case] from: TaskRunState,
        #[case] to: TaskRunState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_pending_is_submittable() {
        assert!(TaskRunState::Pending.is_submittable());
        assert!(!TaskRunState::Running.is_submittable());
        assert!(!TaskRunState::Success.is_submittable());
        assert!(!TaskRunState::Failed.is_submittable());
    }
}
