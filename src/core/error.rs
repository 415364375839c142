use thiserror::Error;

/// Errors raised by a store implementation.
///
/// The backup engine classifies these into its own taxonomy: schema errors
/// become mismatches, `Unavailable` is fatal, everything else is a
/// per-row or per-table warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl StoreError {
    /// True when the referenced table or column does not exist.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::TableNotFound(_) | Self::ColumnNotFound(..))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
