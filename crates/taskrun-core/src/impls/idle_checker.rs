//! WarehouseIdleChecker - warehouse ごとの最終完了時刻を保持する IdleTracker 実装

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::WarehouseId;
use crate::ports::{Clock, IdleTracker};

/// Remembers when each warehouse last finished a task run.
///
/// A warehouse that never finished anything counts as idle.
pub struct WarehouseIdleChecker {
    clock: Arc<dyn Clock>,
    last_finish: Mutex<HashMap<WarehouseId, DateTime<Utc>>>,
}

impl WarehouseIdleChecker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_finish: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<WarehouseId, DateTime<Utc>>> {
        self.last_finish.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_finish_time(&self, warehouse_id: WarehouseId) -> Option<DateTime<Utc>> {
        self.entries().get(&warehouse_id).copied()
    }

    /// Has the warehouse gone at least `idle_for` without finishing a run?
    pub fn is_idle(&self, warehouse_id: WarehouseId, idle_for: Duration) -> bool {
        match self.last_finish_time(warehouse_id) {
            Some(last) => self.clock.now() - last >= idle_for,
            None => true,
        }
    }
}

impl IdleTracker for WarehouseIdleChecker {
    fn update_last_finish_time(&self, warehouse_id: WarehouseId) {
        let now = self.clock.now();
        let mut entries = self.entries();
        let slot = entries.entry(warehouse_id).or_insert(now);
        // 時計が巻き戻っても最終完了時刻は後退させない
        if now > *slot {
            *slot = now;
        }
        debug!(warehouse = %warehouse_id, finished_at = %slot, "updated warehouse last finish time");
    }
}
