//! CompletionHandle - task run の最終結果を受け取るための write-once promise

use tokio::sync::watch;

use super::errors::PipelineError;
use super::state::TaskRunState;

/// What a waiter eventually receives: the terminal state, or the reason the
/// pipeline could not produce one.
pub type Completion = Result<TaskRunState, PipelineError>;

/// Write-once, read-many promise of a task run's outcome.
///
/// The dispatcher resolves it exactly once; any number of consumers may
/// `wait()` on it or poll it with `try_get()`.
#[derive(Debug)]
pub struct CompletionHandle {
    tx: watch::Sender<Option<Completion>>,
}

impl CompletionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolve the handle. Returns `false` if it was already resolved, in
    /// which case the earlier value is kept.
    pub fn complete(&self, completion: Completion) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(completion);
            true
        })
    }

    pub fn is_completed(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn try_get(&self) -> Option<Completion> {
        self.tx.borrow().clone()
    }

    /// Wait until the handle is resolved.
    pub async fn wait(&self) -> Completion {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone().unwrap_or(Err(PipelineError::Abandoned)),
            // sender は self が保持しているので到達しない
            Err(_) => Err(PipelineError::Abandoned),
        }
    }
}

impl Default for CompletionHandle {
    fn default() -> Self {
        Self::new()
    }
}
