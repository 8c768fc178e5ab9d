use std::path::PathBuf;
use std::sync::Arc;

use ab_domain::config::StorageConfig;
use ab_events::{ArtifactStore, EventRecorder};
use ab_storage::Database;

/// The storage + artifact + event-recorder stack every subcommand needs,
/// built once from the resolved `StorageConfig`.
pub struct Harness {
    pub storage: Arc<Database>,
    pub artifacts: Arc<ArtifactStore>,
    pub recorder: Arc<EventRecorder>,
}

impl Harness {
    pub fn open(config: &StorageConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Database::open(&PathBuf::from(&config.database_path), config.row_lock_timeout_ms)?);
        let artifacts = Arc::new(ArtifactStore::new(storage.clone(), PathBuf::from(&config.artifacts_dir), 16 * 1024));
        let recorder = Arc::new(EventRecorder::new(storage.clone(), artifacts.clone()));
        Ok(Self { storage, artifacts, recorder })
    }
}
