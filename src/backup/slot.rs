//! Backup Slot: a single-occupancy holding area for the latest snapshot.
//!
//! Lifecycle: empty -> populated (`put`) -> consumed (`take_and_clear`).
//! Writers overwrite unconditionally; the first successful read empties it.

use super::error::BackupError;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A serialized snapshot waiting to be downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl SlotEntry {
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotStatus {
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct BackupSlot {
    entry: Mutex<Option<SlotEntry>>,
}

impl BackupSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry`, replacing anything not yet downloaded.
    pub fn put(&self, entry: SlotEntry) {
        if self.lock().replace(entry).is_some() {
            tracing::debug!("replaced an undownloaded snapshot");
        }
    }

    /// Hand out the held snapshot and empty the slot.
    pub fn take_and_clear(&self) -> Result<SlotEntry, BackupError> {
        self.lock().take().ok_or(BackupError::NotFound)
    }

    /// Describe the held snapshot without consuming it.
    pub fn status(&self) -> Option<SlotStatus> {
        self.lock().as_ref().map(|entry| SlotStatus {
            size: entry.size(),
            created_at: entry.created_at,
        })
    }

    // Nothing panics while holding the lock, so a poisoned slot still holds
    // a consistent Option.
    fn lock(&self) -> MutexGuard<'_, Option<SlotEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
