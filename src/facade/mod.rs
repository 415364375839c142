pub mod service;

pub use service::{BackupService, Download};
