//! TaskRunStatus - 永続化・監視向けの実行状態

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{QueryId, TaskId};
use super::state::TaskRunState;

/// Persistable view of a task run's progress.
///
/// `process_start_time` is set iff the run entered `Running`, `finish_time`
/// iff it reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub task_id: TaskId,
    pub task_name: String,
    pub query_id: QueryId,
    pub state: TaskRunState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusRecord {
    pub fn new(task_id: TaskId, task_name: impl Into<String>, query_id: QueryId) -> Self {
        Self {
            task_id,
            task_name: task_name.into(),
            query_id,
            state: TaskRunState::Pending,
            process_start_time: None,
            finish_time: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// Shared, mutable status of one task run.
///
/// Only the dispatcher writes to it during an attempt; persistence and
/// monitoring read it through [`TaskRunStatus::snapshot`] whenever they like.
/// Every setter is a single locked write. A reader can therefore see a
/// terminal state whose `finish_time` has not been stamped yet.
#[derive(Debug)]
pub struct TaskRunStatus {
    record: Mutex<StatusRecord>,
}

impl TaskRunStatus {
    pub fn new(task_id: TaskId, task_name: impl Into<String>, query_id: QueryId) -> Self {
        Self::from_record(StatusRecord::new(task_id, task_name, query_id))
    }

    /// Wrap a record loaded from storage.
    pub fn from_record(record: StatusRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    // status の各書き込みは単一フィールドの代入なので、poison されても中身は壊れていない
    fn lock(&self) -> MutexGuard<'_, StatusRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StatusRecord {
        self.lock().clone()
    }

    pub fn state(&self) -> TaskRunState {
        self.lock().state
    }

    pub fn task_name(&self) -> String {
        self.lock().task_name.clone()
    }

    pub fn query_id(&self) -> QueryId {
        self.lock().query_id
    }

    pub fn process_start_time(&self) -> Option<DateTime<Utc>> {
        self.lock().process_start_time
    }

    pub fn finish_time(&self) -> Option<DateTime<Utc>> {
        self.lock().finish_time
    }

    /// Atomically move `Pending -> Running` and stamp the start time.
    ///
    /// On refusal the current state is returned and nothing is written.
    pub fn try_start(&self, now: DateTime<Utc>) -> Result<(), TaskRunState> {
        let mut record = self.lock();
        if !record.state.is_submittable() {
            return Err(record.state);
        }
        record.state = TaskRunState::Running;
        record.process_start_time = Some(now);
        Ok(())
    }

    /// Move a running attempt to a terminal state.
    ///
    /// Illegal moves are refused and the current state is returned.
    pub fn set_state(&self, next: TaskRunState) -> Result<(), TaskRunState> {
        let mut record = self.lock();
        if !record.state.can_transition_to(next) {
            return Err(record.state);
        }
        record.state = next;
        Ok(())
    }

    /// Record a failure of the running attempt.
    pub fn set_failed(&self, error_code: i32, error_message: impl Into<String>) -> Result<(), TaskRunState> {
        let mut record = self.lock();
        if !record.state.can_transition_to(TaskRunState::Failed) {
            return Err(record.state);
        }
        record.state = TaskRunState::Failed;
        record.error_code = Some(error_code);
        record.error_message = Some(error_message.into());
        Ok(())
    }

    /// Stamp the finish time, never earlier than the start time.
    pub fn set_finish_time(&self, now: DateTime<Utc>) {
        let mut record = self.lock();
        let finish = match record.process_start_time {
            Some(start) if start > now => start,
            _ => now,
        };
        record.finish_time = Some(finish);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.lock())
    }
}
