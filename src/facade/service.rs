use crate::backup::{
    BackupError, BackupSlot, ClearAllExecutor, ClearSummary, RestoreExecutor, RestoreInput,
    RestoreSummary, SettingsFilter, SlotEntry, SlotStatus, SnapshotAssembler, SnapshotSummary,
    restore,
};
use crate::config::BackupConfig;
use crate::storage::StorageEngine;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

/// A snapshot handed out for download.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub body: String,
}

/// The three backup operations over one store.
///
/// Restore and clear-all are single-flight: while one runs, another
/// destructive call fails with `OperationInProgress` instead of queueing.
/// Snapshots only read and are never blocked.
pub struct BackupService {
    store: Arc<dyn StorageEngine>,
    config: BackupConfig,
    slot: BackupSlot,
    exclusive: Mutex<()>,
}

impl BackupService {
    pub fn new(store: Arc<dyn StorageEngine>, config: BackupConfig) -> Self {
        Self {
            store,
            config,
            slot: BackupSlot::new(),
            exclusive: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Snapshot every managed table into the slot, replacing any snapshot
    /// not yet downloaded.
    pub async fn create_snapshot(&self) -> Result<SnapshotSummary, BackupError> {
        let assembled = SnapshotAssembler::new(&self.config.planner, &self.config.source_label)
            .assemble(self.store.as_ref())
            .await?;
        let summary = assembled.summary();
        self.slot.put(SlotEntry {
            body: assembled.serialized,
            created_at: summary.created_at,
        });
        Ok(summary)
    }

    /// Hand out the held snapshot. The slot is empty afterwards.
    pub fn download_snapshot(&self) -> Result<Download, BackupError> {
        let entry = self.slot.take_and_clear()?;
        Ok(Download {
            filename: format!(
                "{}-{}.json",
                self.config.filename_prefix,
                Utc::now().format("%Y-%m-%d")
            ),
            body: entry.body,
        })
    }

    pub fn snapshot_status(&self) -> Option<SlotStatus> {
        self.slot.status()
    }

    pub async fn restore(&self, input: RestoreInput) -> Result<RestoreSummary, BackupError> {
        let prepared = restore::prepare(input, self.config.max_restore_bytes)?;
        let _guard = self.acquire()?;
        RestoreExecutor::new(&self.config.planner)
            .execute(self.store.as_ref(), prepared)
            .await
    }

    pub async fn clear_all(&self) -> Result<ClearSummary, BackupError> {
        let _guard = self.acquire()?;
        let filter = SettingsFilter {
            key_column: &self.config.settings_key_column,
            preserved: &self.config.preserved_settings,
        };
        ClearAllExecutor::new(&self.config.planner, filter)
            .execute(self.store.as_ref())
            .await
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, BackupError> {
        self.exclusive.try_lock().map_err(|_| {
            warn!("destructive operation rejected, another one is running");
            BackupError::OperationInProgress
        })
    }
}
