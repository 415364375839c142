//! Clear-all: empty business data while keeping accounts and the
//! configuration a fresh install needs.

use super::error::{BackupError, BackupWarning};
use super::planner::DependencyPlanner;
use super::restore::delete_tables;
use crate::core::Value;
use crate::storage::{StorageEngine, StoreTransaction};
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearSummary {
    pub tables_cleared: usize,
    pub rows_cleared: usize,
    /// Settings rows removed because their key is not preserved.
    pub settings_removed: usize,
    pub warnings: Vec<BackupWarning>,
}

/// Which settings survive a clear-all.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsFilter<'a> {
    pub key_column: &'a str,
    pub preserved: &'a [String],
}

pub struct ClearAllExecutor<'a> {
    planner: &'a DependencyPlanner,
    settings: SettingsFilter<'a>,
}

impl<'a> ClearAllExecutor<'a> {
    pub fn new(planner: &'a DependencyPlanner, settings: SettingsFilter<'a>) -> Self {
        Self { planner, settings }
    }

    pub async fn execute(&self, store: &dyn StorageEngine) -> Result<ClearSummary, BackupError> {
        async {
            let mut tx = store.begin().await.map_err(BackupError::from_store)?;

            let summary = match self.apply(tx.as_mut()).await {
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

            info!(
                tables = summary.tables_cleared,
                rows = summary.rows_cleared,
                settings_removed = summary.settings_removed,
                "clear-all committed"
            );
            Ok(summary)
        }
        .instrument(info_span!("clear_all"))
        .await
    }

    async fn apply(&self, tx: &mut dyn StoreTransaction) -> Result<ClearSummary, BackupError> {
        let mut summary = ClearSummary::default();

        tx.set_referential_integrity(false)
            .await
            .map_err(BackupError::from_store)?;

        let live_tables = tx.list_tables().await.map_err(BackupError::from_store)?;
        let plan = self.planner.plan_clear(&live_tables);

        let targets: Vec<String> = plan.delete_order().cloned().collect();
        let deleted = delete_tables(tx, targets.iter(), &mut summary.warnings).await?;
        summary.tables_cleared = deleted.tables;
        summary.rows_cleared = deleted.rows;

        if let Some(settings) = plan.settings_table() {
            let keep: Vec<Value> = self
                .settings
                .preserved
                .iter()
                .map(|key| Value::Text(key.clone()))
                .collect();
            match tx.delete_except(settings, self.settings.key_column, &keep).await {
                Ok(removed) => {
                    debug!(table = settings, removed, kept = keep.len(), "settings filtered");
                    summary.settings_removed = removed;
                }
                Err(err) if err.is_unavailable() => return Err(BackupError::from_store(err)),
                Err(err) => {
                    warn!(table = settings, error = %err, "settings could not be filtered");
                    summary
                        .warnings
                        .push(BackupWarning::from(&BackupError::scoped(settings, &err)));
                }
            }
        }

        tx.reset_sequences(&targets)
            .await
            .map_err(BackupError::from_store)?;

        tx.set_referential_integrity(true)
            .await
            .map_err(BackupError::from_store)?;

        Ok(summary)
    }
}
