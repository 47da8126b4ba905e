//! Errors - エラー型と分類
//!
//! - `SubmitRejection`: submit 時に同期的に判定される拒否理由
//! - `ProcessorError`: task 自身の処理失敗（FAILED として status に記録される）
//! - `PipelineError`: 実行パイプライン側の故障（completion handle 経由でのみ通知）
//! - `PoolError`: worker pool への投入失敗

use thiserror::Error;

use super::state::TaskRunState;

/// Error code written to the status when the work function fails.
pub const EXECUTION_ERROR_CODE: i32 = -1;

/// Failure raised by a task run's own work function.
///
/// Displays as the bare message: that string is what ends up in the
/// persisted `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProcessorError {
    message: String,
}

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProcessorError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProcessorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Why the dispatcher refused a task run. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("task run is missing")]
    MissingTaskRun,

    #[error("task run has no status")]
    MissingStatus,

    #[error("task run is in {0} state")]
    NotPending(TaskRunState),

    #[error("worker pool refused the task run: {0}")]
    PoolRejected(PoolError),
}

/// The execution pipeline broke down, as opposed to the task failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("failed to enter task run context: {0}")]
    Context(String),

    #[error("failed to clean up after task run: {0}")]
    Cleanup(String),

    #[error("task run was dropped before it completed")]
    Abandoned,
}

/// The worker pool did not take the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool queue is full (capacity={capacity})")]
    Saturated { capacity: usize },

    #[error("worker pool is shut down")]
    ShutDown,
}

/// Invalid executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read env file: {0}")]
    EnvFile(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("pool_name must not be empty")]
    EmptyPoolName,
}
