//! InstanceStore JSON-file implementation.
//!
//! One pretty-printed JSON file per instance under a base directory. Writes
//! go to a uniquely-named temp file first and are committed with an atomic
//! rename, so a crash mid-write never leaves a torn record behind.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use swarmflow_core::store::{InstanceRecord, InstanceStore, StoreError};

/// Durable single-node store: one JSON file per workflow instance.
pub struct FileInstanceStore {
    base_dir: PathBuf,
}

impl FileInstanceStore {
    /// Create a store rooted at the given directory, creating it if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { base_dir })
    }

    fn record_path(&self, instance_id: &str) -> Result<PathBuf, StoreError> {
        // Instance ids become file names; reject path separators outright.
        if instance_id.is_empty() || instance_id.contains(['/', '\\']) {
            return Err(StoreError::Internal(format!(
                "invalid instance id: '{}'",
                instance_id
            )));
        }
        Ok(self.base_dir.join(format!("{}.json", instance_id)))
    }

    fn write_atomic(&self, path: &Path, record: &InstanceRecord) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| StoreError::Internal("record path has no file name".to_string()))?;
        let temp_path = self.base_dir.join(format!(
            "{}.tmp.{}",
            file_name.to_string_lossy(),
            uuid::Uuid::new_v4()
        ));

        fs::write(&temp_path, content).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::Io(format!("failed to commit atomic write: {}", e))
        })?;
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<Option<InstanceRecord>, StoreError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let record = serde_json::from_str(&content)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[async_trait]
impl InstanceStore for FileInstanceStore {
    async fn create(&self, record: &InstanceRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.instance_id)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(record.instance_id.clone()));
        }
        self.write_atomic(&path, record)
    }

    async fn save(&self, record: &InstanceRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.instance_id)?;
        self.write_atomic(&path, record)
    }

    async fn load(&self, instance_id: &str) -> Result<Option<InstanceRecord>, StoreError> {
        let path = self.record_path(instance_id)?;
        self.read_record(&path)
    }

    async fn delete(&self, instance_id: &str) -> Result<bool, StoreError> {
        let path = self.record_path(instance_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_round_trip() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = FileInstanceStore::new(dir.path()).unwrap();

            let mut record = InstanceRecord::new("wf-1", json!({"turn": 0}), Some("create-plan".into()));
            store.create(&record).await.unwrap();
            assert!(matches!(
                store.create(&record).await,
                Err(StoreError::AlreadyExists(_))
            ));

            record.advance(json!({"turn": 1}), Some("inner-loop".into()));
            store.save(&record).await.unwrap();

            let loaded = store.load("wf-1").await.unwrap().unwrap();
            assert_eq!(loaded.state, json!({"turn": 1}));
            assert_eq!(loaded.next_step.as_deref(), Some("inner-loop"));

            assert!(store.delete("wf-1").await.unwrap());
            assert!(store.load("wf-1").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_records_survive_store_reconstruction() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            {
                let store = FileInstanceStore::new(dir.path()).unwrap();
                let record =
                    InstanceRecord::new("wf-1", json!({"facts": "rainy"}), Some("inner-loop".into()));
                store.create(&record).await.unwrap();
            }

            let reopened = FileInstanceStore::new(dir.path()).unwrap();
            let loaded = reopened.load("wf-1").await.unwrap().unwrap();
            assert_eq!(loaded.state, json!({"facts": "rainy"}));
            assert_eq!(loaded.next_step.as_deref(), Some("inner-loop"));
        });
    }

    #[test]
    fn test_rejects_path_separator_in_instance_id() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = FileInstanceStore::new(dir.path()).unwrap();
            let record = InstanceRecord::new("../escape", json!({}), None);
            assert!(matches!(
                store.create(&record).await,
                Err(StoreError::Internal(_))
            ));
        });
    }
}
