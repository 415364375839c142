//! Column-intersection insert construction.
//!
//! Pure: no store access, so the drift rules can be tested against plain
//! column lists.

use super::error::BackupError;
use crate::core::{ColumnDescriptor, DataType, Record, Value};
use crate::storage::InsertStatement;
use chrono::{DateTime, Utc};

const KEY_COLUMN: &str = "id";

/// Boolean columns whose conventional default is `true`.
const TRUE_FLAGS: &[&str] = &["is_active", "active", "enabled", "is_enabled", "visible", "is_visible"];

/// Values substituted for live columns a snapshot row does not carry.
#[derive(Debug, Clone)]
pub struct DefaultsPolicy {
    now: DateTime<Utc>,
}

impl DefaultsPolicy {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Default for a missing live column; `None` leaves the column out of
    /// the statement entirely.
    ///
    /// - `id` is never invented: the store assigns it.
    /// - timestamp columns get "now".
    /// - otherwise the live schema's declared default, if any.
    /// - nullable foreign keys get NULL, since 0 references no row.
    /// - numeric columns get 0, flags their conventional value.
    /// - everything else is NULL.
    pub fn default_for(&self, column: &ColumnDescriptor) -> Option<Value> {
        if column.name == KEY_COLUMN {
            return None;
        }
        let data_type = column.data_type();
        if is_timestamp(column, &data_type) {
            return Some(match data_type {
                DataType::Text => Value::Text(self.now.to_rfc3339()),
                _ => Value::Timestamp(self.now),
            });
        }
        if let Some(default) = &column.default {
            return Some(default.clone());
        }
        if column.references.is_some() && column.nullable {
            return Some(Value::Null);
        }
        Some(match data_type {
            DataType::Integer => Value::Integer(0),
            DataType::Float => Value::Float(0.0),
            DataType::Boolean => Value::Boolean(TRUE_FLAGS.contains(&column.name.as_str())),
            DataType::Text | DataType::Timestamp => Value::Null,
        })
    }
}

fn is_timestamp(column: &ColumnDescriptor, data_type: &DataType) -> bool {
    if *data_type == DataType::Timestamp {
        return true;
    }
    *data_type == DataType::Text && (column.name.ends_with("_at") || column.name == "timestamp")
}

/// An insert built for one snapshot row.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltInsert {
    pub statement: InsertStatement,
    /// Snapshot columns the live table no longer has.
    pub dropped: Vec<String>,
    /// Live columns filled from the defaults policy.
    pub defaulted: Vec<String>,
}

/// Build an insert for `row` against the live column set.
///
/// Snapshot columns absent from the live table are dropped; live columns
/// absent from the row are filled by `policy`. Values are converted to the
/// live column's type, and a value that cannot be converted fails the row.
pub fn build_insert(
    table: &str,
    live_columns: &[ColumnDescriptor],
    row: &Record,
    policy: &DefaultsPolicy,
) -> Result<BuiltInsert, BackupError> {
    let mut columns = Vec::with_capacity(live_columns.len());
    let mut values = Vec::with_capacity(live_columns.len());
    let mut defaulted = Vec::new();

    for column in live_columns {
        match row.get(&column.name) {
            Some(raw) => {
                let value = Value::from_json(raw, &column.data_type()).map_err(|e| {
                    BackupError::ConstraintViolation {
                        table: table.to_string(),
                        detail: format!("column '{}': {}", column.name, e),
                    }
                })?;
                columns.push(column.name.clone());
                values.push(value);
            }
            None => {
                if let Some(value) = policy.default_for(column) {
                    columns.push(column.name.clone());
                    values.push(value);
                    defaulted.push(column.name.clone());
                }
            }
        }
    }

    let dropped = row
        .keys()
        .filter(|name| !live_columns.iter().any(|c| &c.name == *name))
        .cloned()
        .collect();

    Ok(BuiltInsert {
        statement: InsertStatement {
            table: table.to_string(),
            columns,
            values,
        },
        dropped,
        defaulted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForeignKey;
    use serde_json::json;

    fn live() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
            ColumnDescriptor::new("price", "FLOAT"),
            ColumnDescriptor::new("stock", "INTEGER"),
            ColumnDescriptor::new("is_active", "BOOLEAN"),
            ColumnDescriptor::new("is_featured", "BOOLEAN"),
            ColumnDescriptor::new("created_at", "TIMESTAMP"),
            ColumnDescriptor::new("barcode", "TEXT"),
        ]
    }

    fn row(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_columns_get_safe_defaults() {
        let now = Utc::now();
        let built = build_insert(
            "products",
            &live(),
            &row(json!({"id": 7, "name": "Tea"})),
            &DefaultsPolicy::new(now),
        )
        .unwrap();

        let s = &built.statement;
        assert_eq!(s.value_of("id"), Some(&Value::Integer(7)));
        assert_eq!(s.value_of("name"), Some(&Value::from("Tea")));
        assert_eq!(s.value_of("price"), Some(&Value::Float(0.0)));
        assert_eq!(s.value_of("stock"), Some(&Value::Integer(0)));
        assert_eq!(s.value_of("is_active"), Some(&Value::Boolean(true)));
        assert_eq!(s.value_of("is_featured"), Some(&Value::Boolean(false)));
        assert_eq!(s.value_of("created_at"), Some(&Value::Timestamp(now)));
        assert_eq!(s.value_of("barcode"), Some(&Value::Null));
        assert_eq!(built.defaulted.len(), 6);
        assert!(built.dropped.is_empty());
    }

    #[test]
    fn test_missing_id_is_left_to_the_store() {
        let built = build_insert(
            "products",
            &live(),
            &row(json!({"name": "Tea"})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap();
        assert!(!built.statement.columns.contains(&"id".to_string()));
    }

    #[test]
    fn test_removed_columns_are_dropped() {
        let built = build_insert(
            "products",
            &live(),
            &row(json!({"id": 1, "name": "Tea", "legacy_code": "X1"})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap();
        assert_eq!(built.dropped, vec!["legacy_code".to_string()]);
        assert_eq!(built.statement.value_of("legacy_code"), None);
    }

    #[test]
    fn test_declared_default_wins_over_type_default() {
        let mut columns = live();
        columns[3].default = Some(Value::Integer(10));
        let built = build_insert(
            "products",
            &columns,
            &row(json!({"id": 1})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap();
        assert_eq!(built.statement.value_of("stock"), Some(&Value::Integer(10)));
    }

    #[test]
    fn test_missing_reference_defaults_to_null() {
        let mut category = ColumnDescriptor::new("category_id", "INTEGER");
        category.references = Some(ForeignKey {
            table: "categories".into(),
            column: "id".into(),
        });
        let mut sale = ColumnDescriptor::new("sale_id", "INTEGER");
        sale.references = Some(ForeignKey {
            table: "sales".into(),
            column: "id".into(),
        });
        sale.nullable = false;

        let built = build_insert(
            "products",
            &[category, sale],
            &row(json!({})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap();
        assert_eq!(built.statement.value_of("category_id"), Some(&Value::Null));
        assert_eq!(built.statement.value_of("sale_id"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_text_timestamp_column_gets_rfc3339_now() {
        let now = Utc::now();
        let columns = vec![ColumnDescriptor::new("updated_at", "TEXT")];
        let built = build_insert("settings", &columns, &row(json!({})), &DefaultsPolicy::new(now)).unwrap();
        assert_eq!(
            built.statement.value_of("updated_at"),
            Some(&Value::Text(now.to_rfc3339()))
        );
    }

    #[test]
    fn test_unconvertible_value_fails_the_row() {
        let err = build_insert(
            "products",
            &live(),
            &row(json!({"id": 1, "price": "free"})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap_err();
        assert!(matches!(err, BackupError::ConstraintViolation { table, .. } if table == "products"));
    }

    #[test]
    fn test_statement_follows_live_column_order() {
        let built = build_insert(
            "products",
            &live(),
            &row(json!({"barcode": "123", "name": "Tea", "id": 3})),
            &DefaultsPolicy::new(Utc::now()),
        )
        .unwrap();
        assert_eq!(built.statement.columns[0], "id");
        assert_eq!(built.statement.columns[1], "name");
        assert_eq!(built.statement.columns.last().map(String::as_str), Some("barcode"));
    }
}
