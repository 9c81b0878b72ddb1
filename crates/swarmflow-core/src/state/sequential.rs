//! Sequential plan state
//!
//! Minimal framework-owned state for queue-driven execution: just the
//! remaining steps. Responses, history and the final answer belong to the
//! host state.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::PlanStep;

/// Remaining-steps queue for the sequential plan orchestrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequentialPlanState {
    pub remaining_steps: VecDeque<PlanStep>,
}

impl SequentialPlanState {
    /// Create an initial empty state
    pub fn init() -> Self {
        Self::default()
    }

    /// The next step to execute, without removing it
    pub fn next_step(&self) -> Option<&PlanStep> {
        self.remaining_steps.front()
    }

    /// Check if there are more steps to execute
    pub fn has_more_steps(&self) -> bool {
        !self.remaining_steps.is_empty()
    }

    /// Number of steps left
    pub fn len(&self) -> usize {
        self.remaining_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_steps.is_empty()
    }

    /// Set the plan steps for execution
    pub fn with_steps(mut self, steps: Vec<PlanStep>) -> Self {
        self.remaining_steps = steps.into();
        self
    }

    /// Return a new state with the head step dropped
    pub fn remove_first_step(mut self) -> Self {
        self.remaining_steps.pop_front();
        self
    }
}

/// Composition trait for host states carrying a sequential plan state
pub trait WithSequentialPlanState: Sized {
    /// The plan state containing the remaining steps
    fn plan_state(&self) -> &SequentialPlanState;

    /// Return a new state with the updated plan state
    fn with_plan_state(self, plan_state: SequentialPlanState) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_operations() {
        let state = SequentialPlanState::init().with_steps(vec![
            PlanStep::of("weather-agent", "weather"),
            PlanStep::of("activity-agent", "activities"),
        ]);

        assert!(state.has_more_steps());
        assert_eq!(state.len(), 2);
        assert_eq!(
            state.next_step().map(|s| s.agent_ids()),
            Some(vec!["weather-agent"])
        );

        let state = state.remove_first_step();
        assert_eq!(state.len(), 1);
        assert_eq!(
            state.next_step().map(|s| s.agent_ids()),
            Some(vec!["activity-agent"])
        );

        let state = state.remove_first_step();
        assert!(!state.has_more_steps());
        assert!(state.next_step().is_none());
    }
}
