//! ExecutorBuilder - worker pool と dispatcher の構築とワイヤリング
//!
//! 起動時に設定を検証し（Fail-fast）、pool を 1 つだけ作って dispatcher に渡します。
//! pool はプロセスの起動時に作られ、停止時に `TaskRunDispatcher::shutdown` で止めます。

use std::sync::Arc;

use super::config::ExecutorConfig;
use super::dispatcher::TaskRunDispatcher;
use super::pool::WorkerPool;
use crate::domain::ConfigError;
use crate::impls::{NoopContextHook, WarehouseIdleChecker};
use crate::ports::{Clock, ContextHook, IdleTracker, SystemClock};

/// Wires configuration, collaborators and the worker pool into a dispatcher.
///
/// # 使用例
/// ```ignore
/// let dispatcher = ExecutorBuilder::new(ExecutorConfig::from_env()?)
///     .idle_tracker(idle_checker)
///     .build()?;
/// ```
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    clock: Option<Arc<dyn Clock>>,
    idle_tracker: Option<Arc<dyn IdleTracker>>,
    context_hook: Option<Arc<dyn ContextHook>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid executor configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool must be built inside a tokio runtime")]
    NoRuntime,
}

impl ExecutorBuilder {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            clock: None,
            idle_tracker: None,
            context_hook: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn idle_tracker(mut self, idle_tracker: Arc<dyn IdleTracker>) -> Self {
        self.idle_tracker = Some(idle_tracker);
        self
    }

    pub fn context_hook(mut self, context_hook: Arc<dyn ContextHook>) -> Self {
        self.context_hook = Some(context_hook);
        self
    }

    /// Validate the configuration, start the pool and return the dispatcher.
    ///
    /// Without an explicit idle tracker a [`WarehouseIdleChecker`] on the
    /// same clock is used.
    pub fn build(self) -> Result<TaskRunDispatcher, BuildError> {
        self.config.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BuildError::NoRuntime);
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let idle_tracker: Arc<dyn IdleTracker> = match self.idle_tracker {
            Some(idle_tracker) => idle_tracker,
            None => Arc::new(WarehouseIdleChecker::new(Arc::clone(&clock))),
        };
        let context_hook: Arc<dyn ContextHook> = match self.context_hook {
            Some(context_hook) => context_hook,
            None => Arc::new(NoopContextHook),
        };

        let pool = Arc::new(WorkerPool::new(&self.config));
        Ok(TaskRunDispatcher::new(pool, idle_tracker)
            .with_context_hook(context_hook)
            .with_clock(clock))
    }
}
