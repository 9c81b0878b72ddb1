//! Adaptive loop state
//!
//! Everything the adaptive orchestrator tracks between turns. All transitions
//! are by value: callers get a new state back and hand it to the substrate
//! for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{PlanStep, ProgressEvaluation};

/// Pending agent execution, set between the inner loop and the execute step
///
/// Holds either a single agent or a parallel group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingExecution {
    pub step: PlanStep,
}

impl PendingExecution {
    /// Pending execution of a single agent
    pub fn agent(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            step: PlanStep::of(agent_id, instruction),
        }
    }

    /// Pending execution of an arbitrary plan step
    pub fn step(step: PlanStep) -> Self {
        Self { step }
    }
}

/// Pending human approval during a HITL pause
///
/// Present exactly while the workflow is paused for approval. The stored
/// evaluation carries the step to execute once approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub evaluation: ProgressEvaluation,
    pub approval_id: String,
    pub timestamp: DateTime<Utc>,
}

/// State tracked by the adaptive loop orchestrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptiveLoopState {
    /// Accumulated factual context for planning
    pub facts: String,
    /// Current execution plan
    pub plan: String,
    /// Append-only audit log; reset on replan
    pub message_history: Vec<String>,
    /// Latest response per agent; reset on replan
    pub agent_responses: HashMap<String, String>,
    /// Consecutive stalled turns
    pub stall_count: u32,
    /// Total turns taken; survives replans
    pub turn_count: u32,
    /// Replans consumed; monotonic
    pub replan_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_execution: Option<PendingExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approval: Option<PendingApproval>,
}

impl AdaptiveLoopState {
    /// Create an initial empty loop state
    pub fn init() -> Self {
        Self::default()
    }

    pub fn with_facts(mut self, facts: impl Into<String>) -> Self {
        self.facts = facts.into();
        self
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    /// Append an audit line
    pub fn add_message(mut self, message: impl Into<String>) -> Self {
        self.message_history.push(message.into());
        self
    }

    /// Record the latest response from an agent
    pub fn add_agent_response(
        mut self,
        agent_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.agent_responses.insert(agent_id.into(), response.into());
        self
    }

    pub fn increment_stall_count(mut self) -> Self {
        self.stall_count += 1;
        self
    }

    pub fn reset_stall_count(mut self) -> Self {
        self.stall_count = 0;
        self
    }

    pub fn increment_turn_count(mut self) -> Self {
        self.turn_count += 1;
        self
    }

    /// Enter a fresh planning phase
    ///
    /// Clears the audit history, agent responses, stall counter and pendings;
    /// consumes one replan slot. Turn count, facts and plan carry forward
    /// (the replan step rewrites facts and plan in place).
    pub fn start_replanning(mut self) -> Self {
        self.message_history = Vec::new();
        self.agent_responses = HashMap::new();
        self.stall_count = 0;
        self.replan_count += 1;
        self.pending_execution = None;
        self.pending_approval = None;
        self
    }

    pub fn with_pending_agent(
        mut self,
        agent_id: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        self.pending_execution = Some(PendingExecution::agent(agent_id, instruction));
        self
    }

    pub fn with_pending_step(mut self, step: PlanStep) -> Self {
        self.pending_execution = Some(PendingExecution::step(step));
        self
    }

    pub fn clear_pending_execution(mut self) -> Self {
        self.pending_execution = None;
        self
    }

    /// Record a pending approval with a fresh approval id and timestamp
    pub fn with_pending_approval(mut self, evaluation: ProgressEvaluation) -> Self {
        self.pending_approval = Some(PendingApproval {
            evaluation,
            approval_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        });
        self
    }

    pub fn clear_pending_approval(mut self) -> Self {
        self.pending_approval = None;
        self
    }
}

/// Composition trait for host states carrying an adaptive loop state
pub trait WithAdaptiveLoopState: Sized {
    /// The adaptive loop state containing facts, plan, history and counters
    fn loop_state(&self) -> &AdaptiveLoopState;

    /// Return a new state with the updated loop state
    fn with_loop_state(self, loop_state: AdaptiveLoopState) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_messages() {
        let state = AdaptiveLoopState::init()
            .increment_turn_count()
            .increment_turn_count()
            .increment_stall_count()
            .add_message("ORCHESTRATOR: call the weather agent")
            .add_agent_response("weather-agent", "rainy");

        assert_eq!(state.turn_count, 2);
        assert_eq!(state.stall_count, 1);
        assert_eq!(state.message_history.len(), 1);
        assert_eq!(
            state.agent_responses.get("weather-agent").map(String::as_str),
            Some("rainy")
        );

        let reset = state.reset_stall_count();
        assert_eq!(reset.stall_count, 0);
    }

    #[test]
    fn test_start_replanning_resets_loop_scope_only() {
        let state = AdaptiveLoopState::init()
            .with_facts("it rains")
            .with_plan("ask the activity agent")
            .add_message("ORCHESTRATOR: one")
            .add_agent_response("weather-agent", "rainy")
            .increment_turn_count()
            .increment_stall_count()
            .with_pending_agent("weather-agent", "again")
            .start_replanning();

        assert!(state.message_history.is_empty());
        assert!(state.agent_responses.is_empty());
        assert_eq!(state.stall_count, 0);
        assert!(state.pending_execution.is_none());
        assert!(state.pending_approval.is_none());
        assert_eq!(state.replan_count, 1);
        assert_eq!(state.turn_count, 1);
        assert_eq!(state.facts, "it rains");
        assert_eq!(state.plan, "ask the activity agent");
    }

    #[test]
    fn test_pending_approval_gets_unique_id() {
        let eval = ProgressEvaluation::awaiting_completion_approval("review");
        let a = AdaptiveLoopState::init().with_pending_approval(eval.clone());
        let b = AdaptiveLoopState::init().with_pending_approval(eval);

        let id_a = a.pending_approval.as_ref().unwrap().approval_id.clone();
        let id_b = b.pending_approval.as_ref().unwrap().approval_id.clone();
        assert_ne!(id_a, id_b);

        assert!(a.clear_pending_approval().pending_approval.is_none());
    }
}
