//! The backup engine: snapshot, restore and clear-all over a
//! [`StorageEngine`](crate::storage::StorageEngine).

pub mod clear;
pub mod document;
pub mod error;
pub mod insert;
pub mod planner;
pub mod restore;
pub mod slot;
pub mod snapshot;

pub use clear::{ClearAllExecutor, ClearSummary, SettingsFilter};
pub use document::{FORMAT_VERSION, SnapshotDocument, SnapshotMetadata, TableSnapshot};
pub use error::{BackupError, BackupWarning, format_size};
pub use insert::{BuiltInsert, DefaultsPolicy, build_insert};
pub use planner::{DependencyPlanner, TableRole};
pub use restore::{PreparedRestore, RestoreExecutor, RestoreInput, RestoreSummary, TableInsertOutcome};
pub use slot::{BackupSlot, SlotEntry, SlotStatus};
pub use snapshot::{AssembledSnapshot, SnapshotAssembler, SnapshotSummary, snapshot_table};
