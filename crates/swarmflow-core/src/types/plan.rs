//! Plan model
//!
//! A plan step is either a single agent invocation or a flat group of agent
//! invocations executed concurrently. Parallel groups hold only sequential
//! sub-steps, so deeper nesting is unrepresentable.

use serde::{Deserialize, Serialize};

/// A single agent invocation in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialStep {
    /// The agent to execute
    pub agent_id: String,
    /// The instruction for the agent
    pub instruction: String,
}

impl SequentialStep {
    /// Create a new sequential step
    pub fn new(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            instruction: instruction.into(),
        }
    }
}

/// A group of agent invocations executed concurrently
///
/// All calls in the group complete before the plan advances. State updates
/// are applied in submission order after the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelGroup {
    pub steps: Vec<SequentialStep>,
}

/// A step (or group of parallel steps) in an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    /// A single sequential step that executes one agent
    Sequential(SequentialStep),
    /// A group of steps that execute in parallel
    Parallel(ParallelGroup),
}

impl PlanStep {
    /// Create a sequential step (the common case)
    pub fn of(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self::Sequential(SequentialStep::new(agent_id, instruction))
    }

    /// Create a parallel group of steps
    pub fn parallel(steps: Vec<SequentialStep>) -> Self {
        Self::Parallel(ParallelGroup { steps })
    }

    /// Number of agent invocations this step performs
    pub fn agent_count(&self) -> usize {
        match self {
            Self::Sequential(_) => 1,
            Self::Parallel(group) => group.steps.len(),
        }
    }

    /// Agent IDs referenced by this step, in submission order
    pub fn agent_ids(&self) -> Vec<&str> {
        match self {
            Self::Sequential(seq) => vec![seq.agent_id.as_str()],
            Self::Parallel(group) => group.steps.iter().map(|s| s.agent_id.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_step_constructors() {
        let seq = PlanStep::of("weather-agent", "What is the weather in Madrid?");
        assert_eq!(seq.agent_count(), 1);
        assert_eq!(seq.agent_ids(), vec!["weather-agent"]);

        let par = PlanStep::parallel(vec![
            SequentialStep::new("weather-agent", "weather"),
            SequentialStep::new("activity-agent", "activities"),
        ]);
        assert_eq!(par.agent_count(), 2);
        assert_eq!(par.agent_ids(), vec!["weather-agent", "activity-agent"]);
    }

    #[test]
    fn test_plan_step_serde_round_trip() {
        let step = PlanStep::parallel(vec![
            SequentialStep::new("a", "one"),
            SequentialStep::new("b", "two"),
        ]);
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"kind\":\"parallel\""));
        let back: PlanStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
