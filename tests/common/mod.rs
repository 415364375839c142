#![allow(dead_code)]

use async_trait::async_trait;
use shopvault::core::{ColumnDescriptor, Record, Result, StoreError, Value};
use shopvault::storage::{
    InMemoryStore, InsertStatement, SchemaCatalog, StorageEngine, StoreTransaction, retail,
};
use shopvault::{BackupConfig, BackupService};
use std::sync::Arc;

pub const SHOP_TABLES: [&str; 4] = ["categories", "products", "sales", "sale_items"];

/// Core schema with 3 categories, 5 products, 2 sales and 4 line items.
pub async fn demo_store() -> InMemoryStore {
    let store = InMemoryStore::with_tables(retail::core_schema()).await.unwrap();
    retail::seed_demo(&store).await.unwrap();
    store
}

pub fn service_for(store: &InMemoryStore) -> BackupService {
    BackupService::new(Arc::new(store.clone()), BackupConfig::default())
}

/// Create a snapshot and download it.
pub async fn snapshot_body(store: &InMemoryStore) -> String {
    let service = service_for(store);
    service.create_snapshot().await.unwrap();
    service.download_snapshot().unwrap().body
}

pub async fn counts(store: &InMemoryStore, tables: &[&str]) -> Vec<usize> {
    let mut counts = Vec::new();
    for table in tables {
        counts.push(store.row_count(table).await.unwrap());
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// The final commit is rejected.
    Commit,
    /// The store drops away on the first insert.
    Insert,
    /// Deleting from the named table fails; every other table is unaffected.
    Delete(&'static str),
}

/// Wraps a store and injects one failure into its transactions.
pub struct FaultyStore {
    pub inner: InMemoryStore,
    pub fault: Fault,
}

#[async_trait]
impl SchemaCatalog for FaultyStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.inner.list_tables().await
    }

    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.inner.columns_of(table).await
    }
}

#[async_trait]
impl StorageEngine for FaultyStore {
    async fn scan_records(&self, table: &str) -> Result<Vec<Record>> {
        self.inner.scan_records(table).await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    fault: Fault,
}

#[async_trait]
impl SchemaCatalog for FaultyTransaction {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.inner.list_tables().await
    }

    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.inner.columns_of(table).await
    }
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn set_referential_integrity(&mut self, enabled: bool) -> Result<()> {
        self.inner.set_referential_integrity(enabled).await
    }

    async fn delete_all(&mut self, table: &str) -> Result<usize> {
        if let Fault::Delete(locked) = self.fault
            && locked == table
        {
            return Err(StoreError::Execution(format!("table {} is locked", table)));
        }
        self.inner.delete_all(table).await
    }

    async fn delete_except(&mut self, table: &str, column: &str, keep: &[Value]) -> Result<usize> {
        self.inner.delete_except(table, column, keep).await
    }

    async fn reset_sequences(&mut self, tables: &[String]) -> Result<()> {
        self.inner.reset_sequences(tables).await
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<()> {
        if self.fault == Fault::Insert {
            return Err(StoreError::Unavailable("connection reset by peer".into()));
        }
        self.inner.insert(statement).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.fault == Fault::Commit {
            self.inner.rollback().await?;
            return Err(StoreError::Execution("commit rejected: disk full".into()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
