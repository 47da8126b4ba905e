//! taskrun-core
//!
//! Execution core of the task-run scheduler: hands a pending task run to a
//! bounded worker pool at most once, keeps its status in step with the
//! actual execution, and delivers the outcome to whoever waits on it.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, status, task run, completion, errors）
//! - **ports**: 外部コラボレータの抽象化（Clock, IdleTracker, ContextHook, IdGenerator）
//! - **app**: WorkerPool, TaskRunDispatcher, ExecutorBuilder, 設定
//! - **impls**: ports の実装（WarehouseIdleChecker, NoopContextHook）
//! - **observability**: pool の統計

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{ExecutorBuilder, ExecutorConfig, TaskRunDispatcher, WorkerPool};
pub use domain::{
    Completion, CompletionHandle, RunContext, StatusRecord, TaskRun, TaskRunProcessor,
    TaskRunState, TaskRunStatus,
};
