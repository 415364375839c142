use super::{Catalog, InsertStatement, SchemaCatalog, StorageEngine, StoreTransaction, Table, TableSchema};
use crate::core::{Column, ColumnDescriptor, Record, Result, Row, StoreError, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
struct StoreState {
    catalog: Catalog,
    tables: HashMap<String, Table>,
}

impl StoreState {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn insert(&mut self, statement: &InsertStatement, enforce_fk: bool) -> Result<Row> {
        let schema = self.table(&statement.table)?.schema().clone();
        let columns = schema.schema().columns();

        if statement.columns.len() != statement.values.len() {
            return Err(StoreError::Execution(format!(
                "insert into {} binds {} values for {} columns",
                statement.table,
                statement.values.len(),
                statement.columns.len()
            )));
        }

        for name in &statement.columns {
            if schema.schema().find_column_index(name).is_none() {
                return Err(StoreError::ColumnNotFound(name.clone(), statement.table.clone()));
            }
        }

        let row: Row = columns
            .iter()
            .map(|column| match statement.value_of(&column.name) {
                Some(value) => value.clone(),
                None => column.default.clone().unwrap_or(Value::Null),
            })
            .collect();

        if enforce_fk {
            for (column, value) in columns.iter().zip(row.iter()) {
                if let Some(fk) = &column.references
                    && !value.is_null()
                {
                    let parent = self.table(&fk.table)?;
                    if !parent.contains_value(&fk.column, value) {
                        return Err(StoreError::ConstraintViolation(format!(
                            "{}.{} = {} references non-existent key in {}({})",
                            statement.table, column.name, value, fk.table, fk.column
                        )));
                    }
                }
            }
        }

        self.table_mut(&statement.table)?.insert(row)
    }

    /// Fail if any row outside `table` still points at one of `removed`.
    fn check_not_referenced(&self, table: &str, removed: &[Row]) -> Result<()> {
        let schema = self.table(table)?.schema().schema().clone();
        for (child, child_column, fk) in self.catalog.referencing(table) {
            if child == table {
                continue;
            }
            let Some(key_idx) = schema.find_column_index(&fk.column) else {
                continue;
            };
            let child_table = self.table(&child)?;
            for row in removed {
                let key = &row[key_idx];
                if !key.is_null() && child_table.contains_value(&child_column, key) {
                    return Err(StoreError::ConstraintViolation(format!(
                        "Deleting from {} violates foreign key constraint on {}.{}",
                        table, child, child_column
                    )));
                }
            }
        }
        Ok(())
    }

    fn delete_all(&mut self, table: &str, enforce_fk: bool) -> Result<usize> {
        if enforce_fk {
            let removed = self.table(table)?.rows().to_vec();
            self.check_not_referenced(table, &removed)?;
        }
        Ok(self.table_mut(table)?.delete_all())
    }

    fn delete_except(&mut self, table: &str, column: &str, keep: &[Value], enforce_fk: bool) -> Result<usize> {
        let idx = self
            .table(table)?
            .schema()
            .schema()
            .find_column_index(column)
            .ok_or_else(|| StoreError::ColumnNotFound(column.to_string(), table.to_string()))?;

        if enforce_fk {
            let removed: Vec<Row> = self
                .table(table)?
                .rows()
                .iter()
                .filter(|row| !keep.contains(&row[idx]))
                .cloned()
                .collect();
            self.check_not_referenced(table, &removed)?;
        }

        Ok(self.table_mut(table)?.retain(|row| keep.contains(&row[idx])))
    }
}

/// Reference in-memory relational store.
///
/// Cloning is cheap and every clone shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store with the given tables already created.
    pub async fn with_tables(schemas: Vec<TableSchema>) -> Result<Self> {
        let store = Self::new();
        for schema in schemas {
            store.create_table(schema).await?;
        }
        Ok(store)
    }

    /// Simulate the store going away: every call fails with `Unavailable`
    /// until it is set back to available.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        ensure_available(&self.unavailable)
    }

    pub async fn create_table(&self, schema: TableSchema) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let name = schema.name().to_string();
        state.catalog = state.catalog.clone().with_table(schema.clone())?;
        state.tables.insert(name, Table::new(schema));
        Ok(())
    }

    pub async fn drop_table(&self, name: &str) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        state.catalog = state.catalog.clone().without_table(name)?;
        state.tables.remove(name);
        Ok(())
    }

    pub async fn add_column(&self, table: &str, column: Column) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let target = state.table_mut(table)?;
        target.add_column(column)?;
        let schema = target.schema().clone();
        state.catalog = state.catalog.clone().with_replaced(schema)?;
        Ok(())
    }

    pub async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let target = state.table_mut(table)?;
        target.drop_column(column)?;
        let schema = target.schema().clone();
        state.catalog = state.catalog.clone().with_replaced(schema)?;
        Ok(())
    }

    /// Insert one row outside an explicit transaction, foreign keys enforced.
    pub async fn insert_row(&self, table: &str, values: Vec<(&str, Value)>) -> Result<Row> {
        self.ensure_available()?;
        let statement = InsertStatement {
            table: table.to_string(),
            columns: values.iter().map(|(name, _)| name.to_string()).collect(),
            values: values.into_iter().map(|(_, value)| value).collect(),
        };
        self.state.write().await.insert(&statement, true)
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        self.ensure_available()?;
        Ok(self.state.read().await.table(table)?.row_count())
    }

    pub async fn rows(&self, table: &str) -> Result<Vec<Row>> {
        self.ensure_available()?;
        Ok(self.state.read().await.table(table)?.rows().to_vec())
    }

    pub async fn sequence(&self, table: &str) -> Result<i64> {
        self.ensure_available()?;
        Ok(self.state.read().await.table(table)?.sequence())
    }
}

fn ensure_available(flag: &AtomicBool) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(StoreError::Unavailable("store is not reachable".into()));
    }
    Ok(())
}

#[async_trait]
impl SchemaCatalog for InMemoryStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.ensure_available()?;
        Ok(self.state.read().await.catalog.list_tables())
    }

    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.ensure_available()?;
        self.state.read().await.catalog.describe(table)
    }
}

#[async_trait]
impl StorageEngine for InMemoryStore {
    async fn scan_records(&self, table: &str) -> Result<Vec<Record>> {
        self.ensure_available()?;
        Ok(self.state.read().await.table(table)?.to_records())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.ensure_available()?;
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            referential_integrity: true,
            unavailable: self.unavailable.clone(),
        }))
    }
}

/// Transaction over a private copy of the store; the write guard keeps
/// other transactions out until commit or rollback.
pub struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<StoreState>,
    working: StoreState,
    referential_integrity: bool,
    unavailable: Arc<AtomicBool>,
}

#[async_trait]
impl SchemaCatalog for MemoryTransaction {
    async fn list_tables(&self) -> Result<Vec<String>> {
        ensure_available(&self.unavailable)?;
        Ok(self.working.catalog.list_tables())
    }

    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        ensure_available(&self.unavailable)?;
        self.working.catalog.describe(table)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn set_referential_integrity(&mut self, enabled: bool) -> Result<()> {
        ensure_available(&self.unavailable)?;
        self.referential_integrity = enabled;
        Ok(())
    }

    async fn delete_all(&mut self, table: &str) -> Result<usize> {
        ensure_available(&self.unavailable)?;
        self.working.delete_all(table, self.referential_integrity)
    }

    async fn delete_except(&mut self, table: &str, column: &str, keep: &[Value]) -> Result<usize> {
        ensure_available(&self.unavailable)?;
        self.working
            .delete_except(table, column, keep, self.referential_integrity)
    }

    async fn reset_sequences(&mut self, tables: &[String]) -> Result<()> {
        ensure_available(&self.unavailable)?;
        for name in tables {
            if let Some(table) = self.working.tables.get_mut(name) {
                table.reset_sequence();
            }
        }
        Ok(())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<()> {
        ensure_available(&self.unavailable)?;
        self.working
            .insert(statement, self.referential_integrity)
            .map(|_| ())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        ensure_available(&self.unavailable)?;
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
