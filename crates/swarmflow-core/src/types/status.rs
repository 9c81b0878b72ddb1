//! Workflow status and the host-state contract
//!
//! The substrate owns the persisted bytes; it reaches into the host state
//! only through the `WorkflowState` trait.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Budget;

/// Lifecycle status of a workflow instance
///
/// `Completed`, `Failed` and `Stopped` are terminal. `Paused` is not: an
/// approve/resume command returns the instance to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Started,
    Executing,
    Completed,
    Failed,
    Stopped,
    Paused,
}

impl WorkflowStatus {
    /// Check if the workflow has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Check if the workflow is actively running steps
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started | Self::Executing)
    }
}

/// Contract the host workflow state fulfills for the substrate
///
/// Mutation is by value: every transition returns a new state, and the
/// substrate persists whatever a step callback returns.
pub trait WorkflowState:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Current lifecycle status
    fn status(&self) -> WorkflowStatus;

    /// Return a new state with the given status
    fn with_status(self, status: WorkflowStatus) -> Self;

    /// The user-supplied task text
    fn task(&self) -> &str;

    /// Append-only audit log of orchestration decisions and agent outputs
    fn message_history(&self) -> &[String] {
        &[]
    }

    /// Optional budget tracking for cost gating
    fn budget(&self) -> Option<&Budget> {
        None
    }

    /// Extract the final answer, by default the last `FINAL:` audit line
    fn final_answer(&self) -> Option<String> {
        self.message_history()
            .iter()
            .rev()
            .find_map(|m| m.strip_prefix("FINAL: ").map(|s| s.to_string()))
    }
}

/// Transport-agnostic status projection returned by state queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateProjection {
    pub task: String,
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approval_context: Option<String>,
    pub message_history: Vec<String>,
    pub agent_responses: HashMap<String, String>,
}

impl StateProjection {
    /// Create a projection with only the fields every workflow has
    pub fn new(task: impl Into<String>, status: WorkflowStatus) -> Self {
        Self {
            task: task.into(),
            status,
            turn_count: None,
            max_turns: None,
            remaining_steps: None,
            pending_approval_context: None,
            message_history: Vec::new(),
            agent_responses: HashMap::new(),
        }
    }
}
