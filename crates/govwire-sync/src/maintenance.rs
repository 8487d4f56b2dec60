use std::sync::Arc;

use chrono::{DateTime, Utc};
use govwire_storage::{RecordStore, StoreError};
use tracing::info;

/// Daily at 03:00 in the scheduler's timezone.
pub const MAINTENANCE_PATTERN: &str = "0 3 * * *";

/// Soft-deletes records that fell out of the retention window.
#[derive(Clone)]
pub struct Maintenance {
    store: Arc<dyn RecordStore>,
    retention_days: u32,
}

impl Maintenance {
    pub fn new(store: Arc<dyn RecordStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let changed = self.store.deactivate_older_than(self.retention_days, now).await?;
        info!(changed, retention_days = self.retention_days, "retention cleanup finished");
        Ok(changed)
    }
}
