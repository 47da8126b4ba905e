//! 実行中の task run に紐づくコンテキスト
//!
//! worker 上で work を実行している間だけ `RunContext` を task-local に置きます。
//! `ContextScope` は ContextHook の enter / exit を対にする guard で、
//! 明示的に `exit()` しなくても drop 時に必ず exit が呼ばれます。
//! enter 自体が失敗した場合は scope は作られず、exit も呼ばれません。

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::domain::RunContext;
use crate::ports::ContextHook;

tokio::task_local! {
    static CURRENT_RUN: RunContext;
}

/// The context of the task run executing on the current task, if any.
pub fn current_run() -> Option<RunContext> {
    CURRENT_RUN.try_with(RunContext::clone).ok()
}

/// Run `fut` with `ctx` installed as the current run context.
pub(crate) fn with_run_context<F: Future>(ctx: RunContext, fut: F) -> impl Future<Output = F::Output> {
    CURRENT_RUN.scope(ctx, fut)
}

/// Scoped acquisition of the execution context.
pub(crate) struct ContextScope {
    hook: Arc<dyn ContextHook>,
    ctx: RunContext,
    armed: bool,
}

impl ContextScope {
    /// Enter the context, reporting a panicking hook as an error.
    pub(crate) fn enter(hook: Arc<dyn ContextHook>, ctx: RunContext) -> Result<Self, String> {
        panic::catch_unwind(AssertUnwindSafe(|| hook.enter(&ctx)))
            .map_err(|payload| panic_message(payload.as_ref()))?;
        Ok(Self {
            hook,
            ctx,
            armed: true,
        })
    }

    /// Release the context now, reporting a panicking hook as an error.
    pub(crate) fn exit(mut self) -> Result<(), String> {
        self.armed = false;
        let hook = Arc::clone(&self.hook);
        let ctx = &self.ctx;
        panic::catch_unwind(AssertUnwindSafe(|| hook.exit(ctx)))
            .map_err(|payload| panic_message(payload.as_ref()))
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        let hook = Arc::clone(&self.hook);
        let ctx = &self.ctx;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook.exit(ctx))) {
            error!(
                task_name = ctx.task_name(),
                panic = %panic_message(payload.as_ref()),
                "context hook panicked while releasing context"
            );
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}
