use serde::{Deserialize, Serialize};

/// Database path and row-lock timeout (spec §4.8 "lock timeout specified
/// by config").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "d_database_path")]
    pub database_path: String,
    #[serde(default = "d_lock_timeout_ms")]
    pub row_lock_timeout_ms: u64,
    #[serde(default = "d_artifacts_dir")]
    pub artifacts_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: d_database_path(),
            row_lock_timeout_ms: d_lock_timeout_ms(),
            artifacts_dir: d_artifacts_dir(),
        }
    }
}

fn d_database_path() -> String {
    ".autobuildr/autobuildr.db".to_string()
}

fn d_lock_timeout_ms() -> u64 {
    5_000
}

fn d_artifacts_dir() -> String {
    ".autobuildr/artifacts".to_string()
}
