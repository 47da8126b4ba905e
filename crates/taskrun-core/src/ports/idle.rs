//! IdleTracker port - warehouse のアイドル判定への通知

use crate::domain::WarehouseId;

/// Receives "a run on this warehouse just finished" notifications.
///
/// Called once at the end of every execution attempt. Best-effort: the
/// dispatcher neither waits for nor inspects the outcome.
pub trait IdleTracker: Send + Sync {
    fn update_last_finish_time(&self, warehouse_id: WarehouseId);
}
