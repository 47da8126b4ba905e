//! TaskRunDispatcher - PENDING の task run を worker pool に渡して実行する
//!
//! # フロー
//! 1. 受付チェック（task run / status の有無、PENDING か）
//! 2. pool の枠を確保（満杯・停止中ならここで拒否、状態は変えない）
//! 3. 呼び出しスレッド上で PENDING -> RUNNING（原子的）、開始時刻を記録
//! 4. worker 上で work を実行し、終端状態・エラーを status に書く
//! 5. 後始末（コンテキスト解放、終了時刻、warehouse への通知）
//! 6. completion handle を解決
//!
//! 3 は非同期実行より前に完了するので、`submit` が `true` を返した時点で
//! status は必ず RUNNING になっています。同じ run に対する 2 回目の submit は
//! 3 の compare-and-set で負けて `false` になります。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::context::{ContextScope, panic_message, with_run_context};
use super::pool::WorkerPool;
use crate::domain::{
    Completion, EXECUTION_ERROR_CODE, PipelineError, SubmitRejection, TaskRun, TaskRunState,
    TaskRunStatus,
};
use crate::impls::NoopContextHook;
use crate::ports::{Clock, ContextHook, IdleTracker, SystemClock};

/// Hands pending task runs to the worker pool, at most once each.
pub struct TaskRunDispatcher {
    pool: Arc<WorkerPool>,
    idle_tracker: Arc<dyn IdleTracker>,
    context_hook: Arc<dyn ContextHook>,
    clock: Arc<dyn Clock>,
}

impl TaskRunDispatcher {
    pub fn new(pool: Arc<WorkerPool>, idle_tracker: Arc<dyn IdleTracker>) -> Self {
        Self {
            pool,
            idle_tracker,
            context_hook: Arc::new(NoopContextHook),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_context_hook(mut self, context_hook: Arc<dyn ContextHook>) -> Self {
        self.context_hook = context_hook;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Stop the pool and wait for its workers.
    ///
    /// Runs already executing finish normally. Runs still queued are never
    /// started and resolve with [`PipelineError::Abandoned`].
    pub async fn shutdown(&self) {
        self.pool.shutdown_and_join().await;
    }

    /// Asynchronously execute a task run. The return value tells whether it
    /// was submitted; on `false` nothing was changed and no completion will
    /// be delivered.
    pub fn submit(&self, task_run: Option<Arc<TaskRun>>) -> bool {
        let submitted = match task_run {
            Some(task_run) => self.try_submit(task_run),
            None => {
                warn!("task run is missing, avoid executing it");
                Err(SubmitRejection::MissingTaskRun)
            }
        };
        submitted.is_ok()
    }

    /// Like [`TaskRunDispatcher::submit`], reporting why a run was refused.
    pub fn try_submit(&self, task_run: Arc<TaskRun>) -> Result<(), SubmitRejection> {
        let task_name = task_run.run_ctx().task_name();

        let Some(status) = task_run.status().cloned() else {
            warn!(
                task_name,
                query_id = ?task_run.run_ctx().query_id(),
                "task run has no status, avoid executing it"
            );
            return Err(SubmitRejection::MissingStatus);
        };

        let state = status.state();
        if !state.is_submittable() {
            warn!(
                task_name,
                query_id = %status.query_id(),
                %state,
                "task run is not pending, avoid executing it again"
            );
            return Err(SubmitRejection::NotPending(state));
        }

        let slot = self.pool.try_reserve().map_err(|e| {
            warn!(
                task_name,
                query_id = %status.query_id(),
                pool = self.pool.name(),
                error = %e,
                "worker pool refused task run"
            );
            SubmitRejection::PoolRejected(e)
        })?;

        // 永続化側が必ず RUNNING を観測できるよう、非同期実行の前に同期的に遷移させる
        if let Err(state) = status.try_start(self.clock.now()) {
            warn!(
                task_name,
                query_id = %status.query_id(),
                %state,
                "task run was taken by a concurrent submit"
            );
            return Err(SubmitRejection::NotPending(state));
        }

        debug!(task_name, query_id = %status.query_id(), "task run dispatched");

        let attempt = Attempt {
            task_run: Arc::clone(&task_run),
            status,
            idle_tracker: Arc::clone(&self.idle_tracker),
            context_hook: Arc::clone(&self.context_hook),
            clock: Arc::clone(&self.clock),
            finished: false,
            resolved: false,
        };
        slot.dispatch(Box::pin(attempt.run()));
        Ok(())
    }
}

/// One execution attempt, owned by the job running on a pool worker.
///
/// If the job is dropped before it resolves the completion (pool shut down
/// with the job still queued, or the runtime going away), `Drop` finishes
/// the attempt as failed and resolves waiters with
/// [`PipelineError::Abandoned`].
struct Attempt {
    task_run: Arc<TaskRun>,
    status: Arc<TaskRunStatus>,
    idle_tracker: Arc<dyn IdleTracker>,
    context_hook: Arc<dyn ContextHook>,
    clock: Arc<dyn Clock>,
    finished: bool,
    resolved: bool,
}

impl Attempt {
    async fn run(mut self) {
        let ctx = self.task_run.run_ctx().clone();
        let scope = match ContextScope::enter(Arc::clone(&self.context_hook), ctx.clone()) {
            Ok(scope) => scope,
            Err(message) => {
                // コンテキストに入れなかったので work は実行しない
                self.record_outcome(Err(message.clone()));
                self.finish();
                self.resolve(Err(PipelineError::Context(message)));
                return;
            }
        };

        let result = AssertUnwindSafe(with_run_context(ctx, self.task_run.execute()))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(state)) if state.is_terminal() => Ok(state),
            Ok(Ok(state)) => Err(format!("task run returned non-terminal state {state}")),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(panic_message(payload.as_ref())),
        };
        self.record_outcome(outcome);

        let released = scope.exit();
        self.finish();

        let completion: Completion = match released {
            Ok(()) => Ok(self.status.state()),
            Err(message) => {
                warn!(
                    task_name = self.task_run.run_ctx().task_name(),
                    error = %message,
                    "failed to release task run context"
                );
                Err(PipelineError::Cleanup(message))
            }
        };
        self.resolve(completion);
    }

    fn record_outcome(&self, outcome: Result<TaskRunState, String>) {
        let task_name = self.task_run.run_ctx().task_name();
        let query_id = self.status.query_id();

        let written = match &outcome {
            Ok(state) => self.status.set_state(*state),
            Err(message) => self.status.set_failed(EXECUTION_ERROR_CODE, message.as_str()),
        };
        if let Err(current) = written {
            warn!(task_name, %query_id, state = %current, "task run status changed underneath the executor");
            return;
        }

        match outcome {
            Ok(state) => info!(task_name, %query_id, %state, "task run finished"),
            Err(message) => warn!(task_name, %query_id, error = %message, "failed to execute task run"),
        }
    }

    /// Finish time and warehouse notification. Runs exactly once per attempt.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.status.set_finish_time(self.clock.now());

        let warehouse_id = self.task_run.run_ctx().warehouse_id();
        let idle_tracker = Arc::clone(&self.idle_tracker);
        // 通知は best-effort
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| {
            idle_tracker.update_last_finish_time(warehouse_id)
        })) {
            error!(
                warehouse = %warehouse_id,
                panic = %panic_message(payload.as_ref()),
                "failed to update warehouse last finish time"
            );
        }
    }

    fn resolve(&mut self, completion: Completion) {
        self.resolved = true;
        self.task_run.completion().complete(completion);
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let message = PipelineError::Abandoned.to_string();
        if self.status.set_failed(EXECUTION_ERROR_CODE, message.as_str()).is_ok() {
            warn!(
                task_name = self.task_run.run_ctx().task_name(),
                query_id = %self.status.query_id(),
                "task run abandoned before completion"
            );
        }
        self.finish();
        self.resolve(Err(PipelineError::Abandoned));
    }
}
