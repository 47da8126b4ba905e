//! TaskRun - スケジューラから渡される 1 回分の実行単位

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::completion::CompletionHandle;
use super::errors::ProcessorError;
use super::ids::{QueryId, WarehouseId};
use super::state::TaskRunState;
use super::status::TaskRunStatus;

/// Execution context a run executes under.
///
/// The warehouse identifies the resource pool; task name and query id are
/// carried for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    warehouse_id: WarehouseId,
    task_name: String,
    query_id: Option<QueryId>,
}

impl RunContext {
    pub fn new(warehouse_id: WarehouseId, task_name: impl Into<String>) -> Self {
        Self {
            warehouse_id,
            task_name: task_name.into(),
            query_id: None,
        }
    }

    pub fn with_query_id(mut self, query_id: QueryId) -> Self {
        self.query_id = Some(query_id);
        self
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn query_id(&self) -> Option<QueryId> {
        self.query_id
    }
}

/// The actual work of a task run.
///
/// Returns the terminal state the work reached. Errors (and panics) are
/// turned into `Failed` by the dispatcher.
#[async_trait]
pub trait TaskRunProcessor: Send + Sync {
    async fn process(&self, ctx: &RunContext) -> Result<TaskRunState, ProcessorError>;
}

/// One pending unit of scheduled work.
///
/// Owned by the upstream scheduler and shared with the dispatcher for the
/// duration of one attempt.
pub struct TaskRun {
    status: Option<Arc<TaskRunStatus>>,
    run_ctx: RunContext,
    processor: Arc<dyn TaskRunProcessor>,
    completion: CompletionHandle,
}

impl TaskRun {
    pub fn new(
        status: Arc<TaskRunStatus>,
        run_ctx: RunContext,
        processor: Arc<dyn TaskRunProcessor>,
    ) -> Self {
        Self {
            status: Some(status),
            run_ctx,
            processor,
            completion: CompletionHandle::new(),
        }
    }

    /// A run whose status was never attached. The dispatcher refuses it.
    pub fn without_status(run_ctx: RunContext, processor: Arc<dyn TaskRunProcessor>) -> Self {
        Self {
            status: None,
            run_ctx,
            processor,
            completion: CompletionHandle::new(),
        }
    }

    pub fn status(&self) -> Option<&Arc<TaskRunStatus>> {
        self.status.as_ref()
    }

    pub fn run_ctx(&self) -> &RunContext {
        &self.run_ctx
    }

    pub fn completion(&self) -> &CompletionHandle {
        &self.completion
    }

    /// Run the work function once.
    pub async fn execute(&self) -> Result<TaskRunState, ProcessorError> {
        self.processor.process(&self.run_ctx).await
    }
}

impl fmt::Debug for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRun")
            .field("status", &self.status)
            .field("run_ctx", &self.run_ctx)
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}
