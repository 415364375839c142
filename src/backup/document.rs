//! The snapshot document.
//!
//! A loose, self-describing JSON document: `tables` maps each table name to
//! its rows, and rows are column-keyed objects using the store's own column
//! names. Nothing in the document refers to the schema that produced it,
//! which is what lets a restore intersect it with whatever schema is live.

use super::error::{BackupError, BackupWarning};
use crate::core::Record;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// Format version written by this engine.
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub table_name: String,
    pub rows: Vec<Record>,
}

impl TableSnapshot {
    pub fn new(table_name: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            table_name: table_name.into(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Table snapshots in document order, serialized as a `name -> rows` map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotTables(pub Vec<TableSnapshot>);

impl SnapshotTables {
    pub fn get(&self, name: &str) -> Option<&TableSnapshot> {
        self.0.iter().find(|t| t.table_name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSnapshot> {
        self.0.iter()
    }
}

impl Serialize for SnapshotTables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for table in &self.0 {
            map.serialize_entry(&table.table_name, &table.rows)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SnapshotTables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TablesVisitor;

        impl<'de> Visitor<'de> for TablesVisitor {
            type Value = SnapshotTables;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of table names to arrays of row objects")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut tables = Vec::new();
                while let Some((name, rows)) = access.next_entry::<String, Vec<Record>>()? {
                    tables.push(TableSnapshot::new(name, rows));
                }
                Ok(SnapshotTables(tables))
            }
        }

        deserializer.deserialize_map(TablesVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotMetadata {
    pub table_count: usize,
    pub record_count: usize,
    pub approximate_byte_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    #[serde(default)]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_label: String,
    pub tables: SnapshotTables,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl SnapshotDocument {
    /// Wrap table snapshots with metadata. `approximate_byte_size` is filled
    /// in by [`SnapshotDocument::to_json`].
    pub fn new(tables: Vec<TableSnapshot>, source_label: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let table_count = tables.iter().filter(|t| !t.is_empty()).count();
        let record_count = tables.iter().map(|t| t.rows.len()).sum();
        Self {
            format_version: FORMAT_VERSION.to_string(),
            created_at: Some(created_at),
            source_label: source_label.into(),
            tables: SnapshotTables(tables),
            metadata: SnapshotMetadata {
                table_count,
                record_count,
                approximate_byte_size: 0,
            },
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }

    /// Serialize, recording the serialized length in the metadata.
    pub fn to_json(&mut self) -> serde_json::Result<String> {
        // The size field is part of the document; settles within two passes.
        let mut json = serde_json::to_string(self)?;
        while self.metadata.approximate_byte_size != json.len() {
            self.metadata.approximate_byte_size = json.len();
            json = serde_json::to_string(self)?;
        }
        Ok(json)
    }

    /// Parse a serialized document.
    pub fn parse(input: &str) -> Result<Self, BackupError> {
        let value: JsonValue = serde_json::from_str(input)
            .map_err(|e| BackupError::InvalidFormat(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate and convert an already-parsed document.
    pub fn from_value(value: JsonValue) -> Result<Self, BackupError> {
        let Some(object) = value.as_object() else {
            return Err(BackupError::InvalidFormat(
                "document must be a JSON object".into(),
            ));
        };
        match object.get("tables") {
            Some(JsonValue::Object(_)) => {}
            Some(_) => {
                return Err(BackupError::InvalidFormat(
                    "'tables' must be an object".into(),
                ));
            }
            None => {
                return Err(BackupError::InvalidFormat(
                    "document has no 'tables' section".into(),
                ));
            }
        }
        serde_json::from_value(value).map_err(|e| BackupError::InvalidFormat(e.to_string()))
    }

    /// Check the document's format version against the engine's.
    ///
    /// Older or equal major versions are accepted. A newer major version is
    /// rejected; a missing or unreadable version is accepted with a warning.
    pub fn check_version(&self) -> Result<Option<BackupWarning>, BackupError> {
        let current = FormatVersion::parse(FORMAT_VERSION)
            .ok_or_else(|| BackupError::InvalidFormat("engine format version is malformed".into()))?;
        match FormatVersion::parse(&self.format_version) {
            Some(version) if version.major > current.major => Err(BackupError::InvalidFormat(format!(
                "format version {} is newer than supported version {}",
                self.format_version, FORMAT_VERSION
            ))),
            Some(_) => Ok(None),
            None => Ok(Some(BackupWarning::new(
                "FormatVersion",
                format!(
                    "backup has no recognisable format version ({:?}); restoring as {}",
                    self.format_version, FORMAT_VERSION
                ),
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(Self { major, minor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: JsonValue) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> SnapshotDocument {
        SnapshotDocument::new(
            vec![
                TableSnapshot::new("categories", vec![record(json!({"id": 1, "name": "Drinks"}))]),
                TableSnapshot::new("suppliers", vec![]),
                TableSnapshot::new(
                    "products",
                    vec![
                        record(json!({"id": 1, "name": "Tea", "category_id": 1})),
                        record(json!({"id": 2, "name": "Cola", "category_id": 1})),
                    ],
                ),
            ],
            "test",
            Utc::now(),
        )
    }

    #[test]
    fn test_metadata_counts_non_empty_tables() {
        let doc = sample();
        assert_eq!(doc.metadata.table_count, 2);
        assert_eq!(doc.metadata.record_count, 3);
    }

    #[test]
    fn test_serialized_size_is_recorded() {
        let mut doc = sample();
        let json = doc.to_json().unwrap();
        assert_eq!(doc.metadata.approximate_byte_size, json.len());
    }

    #[test]
    fn test_tables_keep_document_order() {
        let mut doc = sample();
        let parsed = SnapshotDocument::parse(&doc.to_json().unwrap()).unwrap();
        let names: Vec<&str> = parsed.tables.iter().map(|t| t.table_name.as_str()).collect();
        assert_eq!(names, vec!["categories", "suppliers", "products"]);
        let columns: Vec<&String> = parsed.table("products").unwrap().rows[0].keys().collect();
        assert_eq!(columns, vec!["id", "name", "category_id"]);
    }

    #[test]
    fn test_missing_tables_is_invalid() {
        let err = SnapshotDocument::parse(r#"{"formatVersion": "1.0"}"#).unwrap_err();
        assert!(matches!(err, BackupError::InvalidFormat(msg) if msg.contains("tables")));
    }

    #[test]
    fn test_malformed_input_is_invalid() {
        assert!(matches!(
            SnapshotDocument::parse("{not json"),
            Err(BackupError::InvalidFormat(_))
        ));
        assert!(matches!(
            SnapshotDocument::parse("[1, 2]"),
            Err(BackupError::InvalidFormat(_))
        ));
        assert!(matches!(
            SnapshotDocument::parse(r#"{"tables": {"products": "oops"}}"#),
            Err(BackupError::InvalidFormat(_))
        ));
        assert!(matches!(
            SnapshotDocument::parse(r#"{"tables": {"products": [1, 2]}}"#),
            Err(BackupError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_minimal_document_is_accepted() {
        let doc = SnapshotDocument::parse(r#"{"tables": {"categories": [{"id": 1}]}}"#).unwrap();
        assert_eq!(doc.table("categories").unwrap().rows.len(), 1);
        assert!(doc.created_at.is_none());
    }

    #[test]
    fn test_version_policy() {
        let mut doc = sample();
        assert_eq!(doc.check_version().unwrap(), None);

        doc.format_version = "0.9".into();
        assert_eq!(doc.check_version().unwrap(), None);

        doc.format_version = "2.0".into();
        assert!(matches!(doc.check_version(), Err(BackupError::InvalidFormat(_))));

        doc.format_version = String::new();
        let warning = doc.check_version().unwrap().unwrap();
        assert_eq!(warning.category, "FormatVersion");
    }
}
