//! ContextHook port - 実行コンテキストの attach / 解放
//!
//! worker が run を実行する間だけコンテキストを保持し、
//! 実行がどう終わっても（成功・失敗・panic・drop）必ず `exit` が呼ばれます。

use crate::domain::RunContext;

/// Collaborator that binds per-run state to the executing worker.
pub trait ContextHook: Send + Sync {
    /// Called right before the work function starts.
    fn enter(&self, _ctx: &RunContext) {}

    /// Called exactly once after the work function stops, on every exit path.
    fn exit(&self, ctx: &RunContext);
}
