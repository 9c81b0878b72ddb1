//! # Swarmflow Runtime
//!
//! The durable workflow engine and the two orchestration strategies that
//! ride on it:
//! - `WorkflowEngine`: step scheduling, atomic persistence, retries,
//!   timeouts, stop/pause/approve command surface
//! - `AdaptiveLoopWorkflow`: outer planning loop + inner execution loop with
//!   stall detection, bounded replanning and HITL pauses
//! - `SequentialPlanWorkflow`: queue-driven execution with parallel groups

pub mod adaptive;
pub mod engine;
pub mod parallel;
pub mod sequential;

pub use adaptive::{AdaptiveLoopConfig, AdaptiveLoopHandler, AdaptiveLoopWorkflow};
pub use engine::{settings_from_config, WorkflowEngine};
pub use sequential::{SequentialPlanConfig, SequentialPlanHandler, SequentialPlanWorkflow};

use thiserror::Error;

/// Rejected orchestrator configuration
#[derive(Debug, Error)]
#[error("invalid orchestrator config: {0}")]
pub struct InvalidConfig(pub String);
