//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **WarehouseIdleChecker**: warehouse ごとの最終完了時刻（IdleTracker）
//! - **NoopContextHook**: 何もしない ContextHook

pub mod idle_checker;
pub mod noop_context;

pub use self::idle_checker::WarehouseIdleChecker;
pub use self::noop_context::NoopContextHook;
