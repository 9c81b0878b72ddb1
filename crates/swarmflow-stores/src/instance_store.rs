//! InstanceStore in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use swarmflow_core::store::{InstanceRecord, InstanceStore, StoreError};

/// In-memory implementation for development and testing.
pub struct InMemoryInstanceStore {
    records: RwLock<HashMap<String, InstanceRecord>>,
}

impl InMemoryInstanceStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryInstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn create(&self, record: &InstanceRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        if records.contains_key(record.instance_id.as_str()) {
            return Err(StoreError::AlreadyExists(record.instance_id.clone()));
        }
        records.insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &InstanceRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        records.insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, instance_id: &str) -> Result<Option<InstanceRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(records.get(instance_id).cloned())
    }

    async fn delete(&self, instance_id: &str) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(records.remove(instance_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_rejects_duplicates() {
        tokio_test::block_on(async {
            let store = InMemoryInstanceStore::new();
            let record = InstanceRecord::new("wf-1", json!({"turn": 0}), Some("inner-loop".into()));

            store.create(&record).await.unwrap();
            let duplicate = store.create(&record).await;
            assert!(matches!(duplicate, Err(StoreError::AlreadyExists(_))));
        });
    }

    #[test]
    fn test_save_load_delete_round_trip() {
        tokio_test::block_on(async {
            let store = InMemoryInstanceStore::new();
            let mut record = InstanceRecord::new("wf-1", json!({"turn": 0}), None);
            store.create(&record).await.unwrap();

            record.advance(json!({"turn": 3}), Some("execute-agent".into()));
            store.save(&record).await.unwrap();

            let loaded = store.load("wf-1").await.unwrap().unwrap();
            assert_eq!(loaded.state, json!({"turn": 3}));
            assert_eq!(loaded.next_step.as_deref(), Some("execute-agent"));

            assert!(store.delete("wf-1").await.unwrap());
            assert!(!store.delete("wf-1").await.unwrap());
            assert!(store.load("wf-1").await.unwrap().is_none());
        });
    }
}
