//! Domain model (ids, state, status, task run, completion, errors).

pub mod completion;
pub mod errors;
pub mod ids;
pub mod state;
pub mod status;
pub mod task_run;

pub use completion::{Completion, CompletionHandle};
pub use errors::{
    ConfigError, EXECUTION_ERROR_CODE, PipelineError, PoolError, ProcessorError, SubmitRejection,
};
pub use ids::{QueryId, TaskId, WarehouseId};
pub use state::TaskRunState;
pub use status::{StatusRecord, TaskRunStatus};
pub use task_run::{RunContext, TaskRun, TaskRunProcessor};
