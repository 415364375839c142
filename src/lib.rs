// ============================================================================
// ShopVault Library
// ============================================================================
//
// Backup and restore for a retail point-of-sale store:
// - `storage`: the store traits the engine drives, plus an in-memory store
// - `backup`: snapshot, restore and clear-all
// - `facade`: `BackupService`, the three operations behind one handle
// - `web`: the HTTP routes

pub mod backup;
pub mod config;
pub mod core;
pub mod facade;
pub mod storage;
pub mod web;

pub use backup::{
    BackupError, BackupWarning, ClearSummary, DependencyPlanner, RestoreInput, RestoreSummary,
    SnapshotDocument, SnapshotSummary,
};
pub use config::BackupConfig;
pub use crate::core::{DataType, Result, StoreError, Value};
pub use facade::{BackupService, Download};
pub use storage::{InMemoryStore, StorageEngine};
