//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **WorkerPool**: bounded な worker pool（leaf）
//! - **TaskRunDispatcher**: PENDING の task run を受け付けて pool で実行する
//! - **ExecutorBuilder**: 設定の検証と pool / dispatcher のワイヤリング
//! - **ExecutorConfig**: pool のサイズ設定
//! - **context**: 実行中の run に紐づく task-local コンテキスト

pub mod builder;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod pool;

pub use self::builder::{BuildError, ExecutorBuilder};
pub use self::config::ExecutorConfig;
pub use self::context::current_run;
pub use self::dispatcher::TaskRunDispatcher;
pub use self::pool::{Job, JobSlot, WorkerPool};
