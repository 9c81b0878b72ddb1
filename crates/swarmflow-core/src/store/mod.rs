//! Instance persistence contract
//!
//! After every step the substrate persists `(state, next_step)` as one
//! atomic record. A crash between persisting and running the next step is
//! recoverable: on restart the driver resumes at `next_step` with the
//! persisted state.
//!
//! Note: Implementations are in the swarmflow-stores crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Instance already exists: {0}")]
    AlreadyExists(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The single atomically-persisted unit for one workflow instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance key
    pub instance_id: String,
    /// Serialized host workflow state
    pub state: Value,
    /// Step to run next; `None` while paused or terminal
    pub next_step: Option<String>,
    /// Set by the stop command; honored at the next step boundary
    #[serde(default)]
    pub stop_requested: bool,
    /// Idempotency keys of mutating commands already applied
    #[serde(default)]
    pub applied_commands: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Create a record positioned at its first step
    pub fn new(instance_id: impl Into<String>, state: Value, next_step: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            instance_id: instance_id.into(),
            state,
            next_step,
            stop_requested: false,
            applied_commands: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a completed step: new state plus the step to run next
    pub fn advance(&mut self, state: Value, next_step: Option<String>) {
        self.state = state;
        self.next_step = next_step;
        self.updated_at = Utc::now();
    }

    /// Flag the instance for stopping at the next step boundary
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
        self.updated_at = Utc::now();
    }

    /// Check whether a mutating command was already applied
    pub fn command_applied(&self, key: &str) -> bool {
        self.applied_commands.iter().any(|k| k == key)
    }

    /// Record a mutating command's idempotency key
    pub fn mark_command(&mut self, key: impl Into<String>) {
        self.applied_commands.push(key.into());
    }
}

/// Instance persistence (async trait)
///
/// `save` must replace the whole record atomically; no partial writes may be
/// observable.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Create a new record; fails with `AlreadyExists` for a known instance
    async fn create(&self, record: &InstanceRecord) -> Result<(), StoreError>;

    /// Replace the record for an existing instance
    async fn save(&self, record: &InstanceRecord) -> Result<(), StoreError>;

    /// Load a record by instance id
    async fn load(&self, instance_id: &str) -> Result<Option<InstanceRecord>, StoreError>;

    /// Delete a record, returning whether it existed
    async fn delete(&self, instance_id: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_advance_and_stop() {
        let mut record = InstanceRecord::new("wf-1", json!({"n": 1}), Some("inner-loop".into()));
        assert!(!record.stop_requested);

        record.advance(json!({"n": 2}), None);
        assert_eq!(record.state, json!({"n": 2}));
        assert!(record.next_step.is_none());

        record.request_stop();
        assert!(record.stop_requested);
    }

    #[test]
    fn test_command_idempotency_keys() {
        let mut record = InstanceRecord::new("wf-1", json!({}), None);
        assert!(!record.command_applied("approve:42"));
        record.mark_command("approve:42");
        assert!(record.command_applied("approve:42"));
        assert!(!record.command_applied("approve:43"));
    }
}
