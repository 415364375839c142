use crate::core::{ColumnDescriptor, Record, Result, Value};
use async_trait::async_trait;

/// Runtime schema reflection.
///
/// Column sets are read at call time and never cached, so callers always see
/// the schema the store has right now.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Names of every table currently present.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of `table` in storage order, or `TableNotFound`.
    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables().await?.iter().any(|name| name == table))
    }
}

/// Storage engine trait - the store operations the backup engine relies on.
#[async_trait]
pub trait StorageEngine: SchemaCatalog {
    /// Read every row of `table` verbatim, in storage order.
    async fn scan_records(&self, table: &str) -> Result<Vec<Record>>;

    /// Open a transaction. The store serialises transactions against each
    /// other; nothing is visible to other readers until `commit`.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// An open store transaction.
///
/// Dropping a transaction without committing discards its changes.
#[async_trait]
pub trait StoreTransaction: SchemaCatalog {
    /// Toggle foreign key enforcement for the rest of this transaction.
    async fn set_referential_integrity(&mut self, enabled: bool) -> Result<()>;

    /// Delete every row of `table`, returning the number removed.
    async fn delete_all(&mut self, table: &str) -> Result<usize>;

    /// Delete every row of `table` whose `column` is not one of `keep`.
    async fn delete_except(&mut self, table: &str, column: &str, keep: &[Value]) -> Result<usize>;

    /// Move each table's auto-increment high-water mark back to its
    /// current maximum key.
    async fn reset_sequences(&mut self, tables: &[String]) -> Result<()>;

    async fn insert(&mut self, statement: &InsertStatement) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// A single-row insert with positional bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertStatement {
    /// Parameterised SQL text, e.g. `INSERT INTO "t" ("a", "b") VALUES ($1, $2)`.
    pub fn to_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=self.values.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table),
            columns,
            placeholders
        )
    }

    pub fn value_of(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
