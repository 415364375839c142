use crate::backup::DependencyPlanner;

/// Default restore ceiling: 10 MiB.
pub const DEFAULT_MAX_RESTORE_BYTES: usize = 10 * 1024 * 1024;

const PRESERVED_SETTINGS: &[&str] = &[
    "setup_completed",
    "business_name",
    "business_address",
    "business_phone",
    "business_email",
    "currency",
    "currency_symbol",
];

/// Backup engine configuration
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Largest restore payload accepted, in bytes
    pub max_restore_bytes: usize,

    /// Free-form label recorded in each snapshot
    pub source_label: String,

    /// Column holding the settings key
    pub settings_key_column: String,

    /// Settings keys that survive clear-all
    pub preserved_settings: Vec<String>,

    /// Table topology
    pub planner: DependencyPlanner,

    /// Download file name prefix; the date and `.json` are appended
    pub filename_prefix: String,
}

impl BackupConfig {
    pub fn new() -> Self {
        Self {
            max_restore_bytes: DEFAULT_MAX_RESTORE_BYTES,
            source_label: "shopvault".to_string(),
            settings_key_column: "key".to_string(),
            preserved_settings: PRESERVED_SETTINGS.iter().map(|s| s.to_string()).collect(),
            planner: DependencyPlanner::retail(),
            filename_prefix: "shopvault-backup".to_string(),
        }
    }

    /// Set the restore ceiling
    pub fn max_restore_bytes(mut self, bytes: usize) -> Self {
        self.max_restore_bytes = bytes;
        self
    }

    /// Set the restore ceiling in MiB
    pub fn max_restore_mib(self, mib: usize) -> Self {
        self.max_restore_bytes(mib.saturating_mul(1024 * 1024))
    }

    pub fn source_label(mut self, label: &str) -> Self {
        self.source_label = label.to_string();
        self
    }

    pub fn settings_key_column(mut self, column: &str) -> Self {
        self.settings_key_column = column.to_string();
        self
    }

    /// Replace the settings allow-list
    pub fn preserved_settings<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserved_settings = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn planner(mut self, planner: DependencyPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn filename_prefix(mut self, prefix: &str) -> Self {
        self.filename_prefix = prefix.to_string();
        self
    }

    /// Request body limit for the restore endpoint.
    ///
    /// Sits above the restore ceiling so oversized payloads reach the
    /// engine's own size check: a string payload is JSON-escaped inside the
    /// request, which can inflate it up to six times.
    pub fn body_limit(&self) -> usize {
        self.max_restore_bytes.saturating_mul(6).saturating_add(64 * 1024)
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::new()
    }
}
