pub mod catalog;
pub mod engine;
pub mod memory;
pub mod retail;
pub mod table;

pub use catalog::Catalog;
pub use engine::{InsertStatement, SchemaCatalog, StorageEngine, StoreTransaction};
pub use memory::{InMemoryStore, MemoryTransaction};
pub use table::{Table, TableSchema};
