//! Restore Executor.
//!
//! Two nested contracts:
//! - outer: one store transaction, committed as a unit or rolled back;
//! - inner: per table and per row, failures are collected and the loop
//!   continues, so the outcome says how much was recovered.

use super::document::SnapshotDocument;
use super::error::{BackupError, BackupWarning};
use super::insert::{DefaultsPolicy, build_insert};
use super::planner::{DependencyPlanner, RestorePlan};
use crate::core::{ColumnDescriptor, Record};
use crate::storage::{StorageEngine, StoreTransaction};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use tracing::{debug, info, info_span, warn, Instrument};

/// Restore input as received: serialized text or an already-parsed object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RestoreInput {
    Serialized(String),
    Parsed(JsonValue),
}

/// A validated document ready to be applied.
#[derive(Debug, Clone)]
pub struct PreparedRestore {
    pub document: SnapshotDocument,
    pub warnings: Vec<BackupWarning>,
}

/// Enforce the restore preconditions. Nothing is mutated here.
///
/// Serialized input is measured before it is parsed; parsed input is
/// measured by its serialized length.
pub fn prepare(input: RestoreInput, max_bytes: usize) -> Result<PreparedRestore, BackupError> {
    let document = match input {
        RestoreInput::Serialized(text) => {
            check_size(text.len(), max_bytes)?;
            SnapshotDocument::parse(&text)?
        }
        RestoreInput::Parsed(value) => {
            let size = serde_json::to_vec(&value)
                .map_err(|e| BackupError::InvalidFormat(e.to_string()))?
                .len();
            check_size(size, max_bytes)?;
            SnapshotDocument::from_value(value)?
        }
    };
    let warnings = document.check_version()?.into_iter().collect();
    Ok(PreparedRestore { document, warnings })
}

fn check_size(size: usize, limit: usize) -> Result<(), BackupError> {
    if size > limit {
        return Err(BackupError::PayloadTooLarge {
            size: Some(size),
            limit,
        });
    }
    Ok(())
}

/// Outcome of the per-row insert loop for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableInsertOutcome {
    pub table: String,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<BackupError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreSummary {
    pub tables_restored: usize,
    pub rows_restored: usize,
    pub rows_skipped: usize,
    /// Tables emptied before re-insertion; a table whose delete failed is
    /// not counted.
    pub tables_cleared: usize,
    /// Rows deleted before re-insertion.
    pub rows_cleared: usize,
    pub tables: Vec<TableInsertOutcome>,
    pub warnings: Vec<BackupWarning>,
}

impl RestoreSummary {
    fn record(&mut self, outcome: TableInsertOutcome) {
        if outcome.inserted > 0 {
            self.tables_restored += 1;
        }
        self.rows_restored += outcome.inserted;
        self.rows_skipped += outcome.skipped;
        self.warnings.extend(outcome.errors.iter().map(BackupWarning::from));
        self.tables.push(outcome);
    }

    pub fn outcome(&self, table: &str) -> Option<&TableInsertOutcome> {
        self.tables.iter().find(|t| t.table == table)
    }
}

pub struct RestoreExecutor<'a> {
    planner: &'a DependencyPlanner,
}

impl<'a> RestoreExecutor<'a> {
    pub fn new(planner: &'a DependencyPlanner) -> Self {
        Self { planner }
    }

    /// Replace the managed tables' contents with `prepared`'s rows.
    pub async fn execute(
        &self,
        store: &dyn StorageEngine,
        prepared: PreparedRestore,
    ) -> Result<RestoreSummary, BackupError> {
        let span = info_span!("restore", source = %prepared.document.source_label);
        async move {
            let PreparedRestore { document, warnings } = prepared;
            let mut tx = store.begin().await.map_err(BackupError::from_store)?;

            let mut summary = match self.apply(tx.as_mut(), &document).await {
                Ok(summary) => summary,
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "rollback failed");
                    }
                    return Err(err);
                }
            };

            tx.commit()
                .await
                .map_err(|e| BackupError::TransactionFailed(e.to_string()))?;

            let applied = std::mem::replace(&mut summary.warnings, warnings);
            summary.warnings.extend(applied);
            info!(
                tables = summary.tables_restored,
                rows = summary.rows_restored,
                skipped = summary.rows_skipped,
                warnings = summary.warnings.len(),
                "restore committed"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        document: &SnapshotDocument,
    ) -> Result<RestoreSummary, BackupError> {
        let mut summary = RestoreSummary::default();

        tx.set_referential_integrity(false)
            .await
            .map_err(BackupError::from_store)?;

        let live_tables = tx.list_tables().await.map_err(BackupError::from_store)?;
        let plan = self.planner.plan_restore(&live_tables);

        let deleted = delete_tables(tx, plan.delete_order(), &mut summary.warnings).await?;
        summary.tables_cleared = deleted.tables;
        summary.rows_cleared = deleted.rows;

        tx.reset_sequences(plan.insert_order())
            .await
            .map_err(BackupError::from_store)?;

        self.report_skipped_tables(document, &plan, &live_tables, &mut summary.warnings);

        let policy = DefaultsPolicy::new(Utc::now());
        for table in plan.insert_order() {
            let Some(snapshot) = document.table(table) else {
                continue;
            };
            if snapshot.is_empty() {
                continue;
            }
            let live_columns = match tx.columns_of(table).await {
                Ok(columns) => columns,
                Err(err) if err.is_unavailable() => return Err(BackupError::from_store(err)),
                Err(err) => {
                    let scoped = BackupError::scoped(table, &err);
                    warn!(table = %table, error = %err, "columns unavailable, table skipped");
                    summary.warnings.push(BackupWarning::from(&scoped));
                    continue;
                }
            };
            let outcome = insert_rows(tx, table, &live_columns, &snapshot.rows, &policy).await?;
            summary.record(outcome);
        }

        tx.set_referential_integrity(true)
            .await
            .map_err(BackupError::from_store)?;

        Ok(summary)
    }

    fn report_skipped_tables(
        &self,
        document: &SnapshotDocument,
        plan: &RestorePlan,
        live_tables: &[String],
        warnings: &mut Vec<BackupWarning>,
    ) {
        for snapshot in document.tables.iter().filter(|t| !t.is_empty()) {
            let name = &snapshot.table_name;
            if plan.contains(name) {
                continue;
            }
            let detail = if !self.planner.is_known(name) {
                "table is not managed by backups"
            } else if !live_tables.contains(name) {
                "table does not exist in the current schema"
            } else {
                continue;
            };
            warn!(table = %name, rows = snapshot.rows.len(), detail, "snapshot table skipped");
            warnings.push(BackupWarning::from(&BackupError::SchemaMismatch {
                table: name.clone(),
                detail: format!("{} ({} rows not restored)", detail, snapshot.rows.len()),
            }));
        }
    }
}

/// Tables and rows removed by [`delete_tables`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Deleted {
    pub tables: usize,
    pub rows: usize,
}

/// Delete every row of each table, in the order given. A table that cannot
/// be cleared is reported and skipped; an unreachable store is fatal.
pub(crate) async fn delete_tables<'t>(
    tx: &mut dyn StoreTransaction,
    tables: impl Iterator<Item = &'t String>,
    warnings: &mut Vec<BackupWarning>,
) -> Result<Deleted, BackupError> {
    let mut deleted = Deleted::default();
    for table in tables {
        match tx.delete_all(table).await {
            Ok(count) => {
                debug!(table = %table, rows = count, "table cleared");
                deleted.tables += 1;
                deleted.rows += count;
            }
            Err(err) if err.is_unavailable() => return Err(BackupError::from_store(err)),
            Err(err) => {
                warn!(table = %table, error = %err, "table could not be cleared, skipped");
                warnings.push(BackupWarning::from(&BackupError::scoped(table, &err)));
            }
        }
    }
    Ok(deleted)
}

/// Insert each row independently. A failed row is counted and recorded; the
/// loop carries on with the next one.
pub async fn insert_rows(
    tx: &mut dyn StoreTransaction,
    table: &str,
    live_columns: &[ColumnDescriptor],
    rows: &[Record],
    policy: &DefaultsPolicy,
) -> Result<TableInsertOutcome, BackupError> {
    let mut outcome = TableInsertOutcome {
        table: table.to_string(),
        ..Default::default()
    };
    let mut dropped = BTreeSet::new();

    for (index, row) in rows.iter().enumerate() {
        let built = match build_insert(table, live_columns, row, policy) {
            Ok(built) => built,
            Err(err) => {
                warn!(table, row = index, error = %err, "row skipped");
                outcome.skipped += 1;
                outcome.errors.push(err);
                continue;
            }
        };
        dropped.extend(built.dropped);

        match tx.insert(&built.statement).await {
            Ok(()) => outcome.inserted += 1,
            Err(err) if err.is_unavailable() => return Err(BackupError::from_store(err)),
            Err(err) => {
                warn!(table, row = index, error = %err, "row skipped");
                debug!(
                    sql = %built.statement.to_sql(),
                    values = built.statement.values.len(),
                    "rejected insert"
                );
                outcome.skipped += 1;
                outcome.errors.push(BackupError::scoped(table, &err));
            }
        }
    }

    if !dropped.is_empty() {
        debug!(table, columns = ?dropped, "snapshot columns not in live schema were dropped");
    }
    debug!(table, inserted = outcome.inserted, skipped = outcome.skipped, "table restored");
    Ok(outcome)
}
