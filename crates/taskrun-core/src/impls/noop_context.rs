//! NoopContextHook - コンテキストを何も保持しない ContextHook 実装

use crate::domain::RunContext;
use crate::ports::ContextHook;

/// A hook for deployments that keep no per-worker state besides the task-local context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContextHook;

impl ContextHook for NoopContextHook {
    fn exit(&self, _ctx: &RunContext) {}
}
