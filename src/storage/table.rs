use crate::core::{Column, Record, Result, Row, Schema, StoreError, Value};

#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
    /// Auto-increment high-water mark: the last key handed out.
    sequence: i64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            sequence: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Insert a full-width row. A NULL auto-increment key is assigned from
    /// the sequence; an explicit key moves the sequence forward past it.
    pub fn insert(&mut self, mut row: Row) -> Result<Row> {
        let columns = self.schema.schema().columns();
        if row.len() != columns.len() {
            return Err(StoreError::Execution(format!(
                "Expected {} columns, got {}",
                columns.len(),
                row.len()
            )));
        }

        if let Some(idx) = self.auto_increment_index()
            && row[idx].is_null()
        {
            row[idx] = Value::Integer(self.sequence + 1);
        }

        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        self.check_uniqueness(&row)?;

        if let Some(idx) = self.auto_increment_index()
            && let Some(key) = row[idx].as_i64()
        {
            self.sequence = self.sequence.max(key);
        }

        self.rows.push(row.clone());
        Ok(row)
    }

    pub fn delete_all(&mut self) -> usize {
        let removed = self.rows.len();
        self.rows.clear();
        removed
    }

    /// Keep only the rows matching `keep`, returning the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Row) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Move the sequence back to the largest key still present.
    pub fn reset_sequence(&mut self) {
        self.sequence = match self.auto_increment_index() {
            Some(idx) => self
                .rows
                .iter()
                .filter_map(|row| row[idx].as_i64())
                .max()
                .unwrap_or(0),
            None => 0,
        };
    }

    /// True when some row holds `value` in `column`.
    pub fn contains_value(&self, column: &str, value: &Value) -> bool {
        match self.schema.schema().find_column_index(column) {
            Some(idx) => self.rows.iter().any(|row| &row[idx] == value),
            None => false,
        }
    }

    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema.schema().get_column(&column.name).is_some() {
            return Err(StoreError::Execution(format!(
                "Column '{}' already exists in table '{}'",
                column.name,
                self.schema.name()
            )));
        }
        let fill = column.default.clone().unwrap_or(Value::Null);
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        self.schema.push_column(column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .schema
            .schema()
            .find_column_index(name)
            .ok_or_else(|| StoreError::ColumnNotFound(name.to_string(), self.schema.name().to_string()))?;
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.schema.remove_column(idx);
        Ok(())
    }

    /// Rows as column-keyed records in storage order.
    pub fn to_records(&self) -> Vec<Record> {
        let columns = self.schema.schema().columns();
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, value)| (column.name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }

    fn auto_increment_index(&self) -> Option<usize> {
        self.schema
            .schema()
            .columns()
            .iter()
            .position(|col| col.auto_increment)
    }

    fn check_uniqueness(&self, row: &Row) -> Result<()> {
        for (col_idx, column) in self.schema.schema().columns().iter().enumerate() {
            if !(column.primary_key || column.unique) {
                continue;
            }
            let value = &row[col_idx];
            if value.is_null() {
                continue;
            }
            if self.rows.iter().any(|existing| &existing[col_idx] == value) {
                return Err(StoreError::ConstraintViolation(format!(
                    "Unique constraint violation: Column '{}.{}' already contains value {}",
                    self.schema.name(),
                    column.name,
                    value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn push_column(&mut self, column: Column) {
        let mut columns = self.schema.columns().to_vec();
        columns.push(column);
        self.schema = Schema::new(columns);
    }

    fn remove_column(&mut self, idx: usize) {
        let mut columns = self.schema.columns().to_vec();
        columns.remove(idx);
        self.schema = Schema::new(columns);
    }
}
