//! # Swarmflow Stores
//!
//! Instance store implementations:
//! - `InMemoryInstanceStore` for development and testing
//! - `FileInstanceStore` for durable single-node deployments

mod file_store;
mod instance_store;

pub use file_store::FileInstanceStore;
pub use instance_store::InMemoryInstanceStore;

pub use swarmflow_core::store::{InstanceRecord, InstanceStore, StoreError};
