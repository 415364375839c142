use crate::core::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackupError {
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    /// `size` is unknown when the body was cut off before it was fully read.
    #[error("{}", too_large(.size, .limit))]
    PayloadTooLarge { size: Option<usize>, limit: usize },

    #[error("Constraint violation in '{table}': {detail}")]
    ConstraintViolation { table: String, detail: String },

    #[error("Schema mismatch on '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Store unreachable: {0}")]
    ConnectivityFailure(String),

    #[error("No backup is available for download")]
    NotFound,

    #[error("Another restore or clear operation is already running")]
    OperationInProgress,
}

impl BackupError {
    /// Classify a store error that ends the whole operation.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::ConnectivityFailure(msg),
            other => Self::TransactionFailed(other.to_string()),
        }
    }

    /// Classify a store error scoped to one table or row.
    pub fn scoped(table: &str, err: &StoreError) -> Self {
        if err.is_schema() {
            Self::SchemaMismatch {
                table: table.to_string(),
                detail: err.to_string(),
            }
        } else {
            Self::ConstraintViolation {
                table: table.to_string(),
                detail: err.to_string(),
            }
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "InvalidFormat",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::ConstraintViolation { .. } => "ConstraintViolation",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::TransactionFailed(_) => "TransactionFailed",
            Self::ConnectivityFailure(_) => "ConnectivityFailure",
            Self::NotFound => "NotFound",
            Self::OperationInProgress => "OperationInProgress",
        }
    }

    /// Short operator-facing message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidFormat(_) => "The backup file is not a valid backup.".to_string(),
            Self::PayloadTooLarge { limit, .. } => format!(
                "The backup file is too large. The maximum size is {}.",
                format_size(*limit)
            ),
            Self::ConstraintViolation { table, .. } => {
                format!("A record in '{}' could not be restored.", table)
            }
            Self::SchemaMismatch { table, .. } => {
                format!("'{}' does not match the current database layout.", table)
            }
            Self::TransactionFailed(_) => {
                "The restore could not be completed. No changes were made.".to_string()
            }
            Self::ConnectivityFailure(_) => "The database is not reachable.".to_string(),
            Self::NotFound => "No backup is available. Create one first.".to_string(),
            Self::OperationInProgress => {
                "Another restore or clear operation is in progress.".to_string()
            }
        }
    }

    /// Diagnostic detail, when there is more to say than the user message.
    pub fn technical(&self) -> Option<String> {
        match self {
            Self::NotFound | Self::OperationInProgress => None,
            other => Some(other.to_string()),
        }
    }
}

/// A recovered per-table or per-row problem reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupWarning {
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub message: String,
}

impl BackupWarning {
    pub fn new(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            table: None,
            message: message.into(),
        }
    }
}

impl From<&BackupError> for BackupWarning {
    fn from(err: &BackupError) -> Self {
        let table = match err {
            BackupError::ConstraintViolation { table, .. }
            | BackupError::SchemaMismatch { table, .. } => Some(table.clone()),
            _ => None,
        };
        Self {
            category: err.category(),
            table,
            message: err.to_string(),
        }
    }
}

fn too_large(size: &Option<usize>, limit: &usize) -> String {
    match size {
        Some(size) => format!("Backup payload is {} bytes, limit is {} bytes", size, limit),
        None => format!("Backup payload exceeds the limit of {} bytes", limit),
    }
}

/// Human-readable byte count: `512 B`, `1.50 KB`, `10.00 MB`.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{:.2} MB", b / MB)
    }
}
