use super::document::{SnapshotDocument, TableSnapshot};
use super::error::BackupError;
use super::planner::DependencyPlanner;
use crate::core::StoreError;
use crate::storage::StorageEngine;
use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, Instrument};

/// Read every row of `table` as it exists right now.
///
/// A table missing from the live catalog yields an empty snapshot: newer or
/// optional tables must not fail a backup.
pub async fn snapshot_table(store: &dyn StorageEngine, table: &str) -> Result<TableSnapshot, BackupError> {
    if !store.table_exists(table).await.map_err(BackupError::from_store)? {
        debug!(table, "table not present, snapshotting as empty");
        return Ok(TableSnapshot::new(table, Vec::new()));
    }
    match store.scan_records(table).await {
        Ok(rows) => Ok(TableSnapshot::new(table, rows)),
        // dropped between the catalog check and the scan
        Err(StoreError::TableNotFound(_)) => Ok(TableSnapshot::new(table, Vec::new())),
        Err(err) => Err(BackupError::from_store(err)),
    }
}

/// Summary returned to the caller instead of the full document.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub table_count: usize,
    pub record_count: usize,
    pub approximate_byte_size: usize,
    pub created_at: DateTime<Utc>,
}

/// An assembled document and its serialized form.
#[derive(Debug, Clone)]
pub struct AssembledSnapshot {
    pub document: SnapshotDocument,
    pub serialized: String,
}

impl AssembledSnapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            table_count: self.document.metadata.table_count,
            record_count: self.document.metadata.record_count,
            approximate_byte_size: self.document.metadata.approximate_byte_size,
            created_at: self.document.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Runs the snapshotter over every table the planner knows, in dependency
/// order, and wraps the result with metadata.
pub struct SnapshotAssembler<'a> {
    planner: &'a DependencyPlanner,
    source_label: &'a str,
}

impl<'a> SnapshotAssembler<'a> {
    pub fn new(planner: &'a DependencyPlanner, source_label: &'a str) -> Self {
        Self {
            planner,
            source_label,
        }
    }

    pub async fn assemble(&self, store: &dyn StorageEngine) -> Result<AssembledSnapshot, BackupError> {
        let span = info_span!("create_snapshot", source = self.source_label);
        async {
            let mut tables = Vec::new();
            let mut running_total = 0usize;
            for name in self.planner.insert_order() {
                let snapshot = snapshot_table(store, name).await?;
                running_total += snapshot.rows.len();
                debug!(table = name, rows = snapshot.rows.len(), running_total, "table captured");
                tables.push(snapshot);
            }

            let mut document = SnapshotDocument::new(tables, self.source_label, Utc::now());
            let serialized = document
                .to_json()
                .map_err(|e| BackupError::InvalidFormat(format!("snapshot could not be serialized: {}", e)))?;

            info!(
                tables = document.metadata.table_count,
                records = document.metadata.record_count,
                bytes = document.metadata.approximate_byte_size,
                "snapshot created"
            );
            Ok(AssembledSnapshot {
                document,
                serialized,
            })
        }
        .instrument(span)
        .await
    }
}
