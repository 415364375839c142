use std::collections::HashMap;
use std::sync::Arc;
use crate::core::{ColumnDescriptor, ForeignKey, Result, StoreError};
use super::TableSchema;

/// Table metadata, immutable once built.
///
/// Schema changes produce a new catalog (copy-on-write), so a transaction can
/// hold its own view while the committed one stays readable.
#[derive(Clone, Debug)]
pub struct Catalog {
    tables: Arc<HashMap<String, TableSchema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(HashMap::new()),
        }
    }

    /// Add a table, returning the new catalog.
    pub fn with_table(self, schema: TableSchema) -> Result<Self> {
        let name = schema.name().to_string();

        if self.tables.contains_key(&name) {
            return Err(StoreError::TableExists(name));
        }

        let mut new_tables = (*self.tables).clone();
        new_tables.insert(name, schema);

        Ok(Self {
            tables: Arc::new(new_tables),
        })
    }

    /// Replace the definition of an existing table.
    pub fn with_replaced(self, schema: TableSchema) -> Result<Self> {
        if !self.tables.contains_key(schema.name()) {
            return Err(StoreError::TableNotFound(schema.name().to_string()));
        }

        let mut new_tables = (*self.tables).clone();
        new_tables.insert(schema.name().to_string(), schema);

        Ok(Self {
            tables: Arc::new(new_tables),
        })
    }

    pub fn without_table(self, name: &str) -> Result<Self> {
        if !self.tables.contains_key(name) {
            return Err(StoreError::TableNotFound(name.to_string()));
        }

        let mut new_tables = (*self.tables).clone();
        new_tables.remove(name);

        Ok(Self {
            tables: Arc::new(new_tables),
        })
    }

    pub fn get_table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn describe(&self, name: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self
            .get_table(name)?
            .schema()
            .columns()
            .iter()
            .map(|column| column.descriptor())
            .collect())
    }

    /// Foreign keys pointing at `table`, as `(child table, child column, key)`.
    pub fn referencing(&self, table: &str) -> Vec<(String, String, ForeignKey)> {
        let mut refs = Vec::new();
        for (child, schema) in self.tables.iter() {
            for column in schema.schema().columns() {
                if let Some(fk) = &column.references
                    && fk.table == table
                {
                    refs.push((child.clone(), column.name.clone(), fk.clone()));
                }
            }
        }
        refs
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    #[test]
    fn test_copy_on_write() {
        let base = Catalog::new();
        let next = base
            .clone()
            .with_table(TableSchema::new("categories", vec![Column::id("id")]))
            .unwrap();
        assert!(!base.table_exists("categories"));
        assert!(next.table_exists("categories"));
        assert!(matches!(
            next.clone().with_table(TableSchema::new("categories", vec![])),
            Err(StoreError::TableExists(_))
        ));
    }

    #[test]
    fn test_referencing() {
        let catalog = Catalog::new()
            .with_table(TableSchema::new("categories", vec![Column::id("id")]))
            .unwrap()
            .with_table(TableSchema::new(
                "products",
                vec![
                    Column::id("id"),
                    Column::new("category_id", DataType::Integer).references("categories", "id"),
                ],
            ))
            .unwrap();
        let refs = catalog.referencing("categories");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "products");
        assert_eq!(refs[0].1, "category_id");
        assert!(catalog.referencing("products").is_empty());
    }
}
