pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StoreError};
pub use types::{Column, ColumnDescriptor, ForeignKey, Record, Row, Schema};
pub use value::{DataType, Value};
