//! Progress evaluation
//!
//! The sum-typed decision produced by the host orchestrator callback for each
//! turn of the adaptive inner loop. Serializable because a pending approval
//! stores the evaluation it was raised for.

use serde::{Deserialize, Serialize};

use super::PlanStep;

/// Result of progress evaluation for one turn of the adaptive loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgressEvaluation {
    /// The task is done; proceed to summarization
    Complete { reason: String },
    /// Continue by executing a single agent
    ContinueAgent { agent_id: String, instruction: String },
    /// Continue by executing an arbitrary plan step (parallel-capable)
    ContinueStep { step: PlanStep },
    /// No forward progress this turn; still names the agent to try next
    Stalled {
        agent_id: String,
        instruction: String,
        reason: String,
    },
    /// Pause for human approval before proceeding
    ///
    /// `next_step = None` marks a completion approval: on approve the
    /// workflow goes straight to summarization.
    AwaitingApproval {
        next_step: Option<PlanStep>,
        context: String,
    },
}

impl ProgressEvaluation {
    pub fn complete(reason: impl Into<String>) -> Self {
        Self::Complete {
            reason: reason.into(),
        }
    }

    pub fn continue_agent(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self::ContinueAgent {
            agent_id: agent_id.into(),
            instruction: instruction.into(),
        }
    }

    pub fn continue_step(step: PlanStep) -> Self {
        Self::ContinueStep { step }
    }

    pub fn stalled(
        agent_id: impl Into<String>,
        instruction: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Stalled {
            agent_id: agent_id.into(),
            instruction: instruction.into(),
            reason: reason.into(),
        }
    }

    /// Pause and await approval before executing `next_step`
    pub fn awaiting_approval(next_step: PlanStep, context: impl Into<String>) -> Self {
        Self::AwaitingApproval {
            next_step: Some(next_step),
            context: context.into(),
        }
    }

    /// Pause before completion to let a human review the final answer
    pub fn awaiting_completion_approval(context: impl Into<String>) -> Self {
        Self::AwaitingApproval {
            next_step: None,
            context: context.into(),
        }
    }

    /// True for approval pauses with no follow-up step
    pub fn is_completion_approval(&self) -> bool {
        matches!(
            self,
            Self::AwaitingApproval {
                next_step: None,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_approval_classification() {
        let completion = ProgressEvaluation::awaiting_completion_approval("review the answer");
        assert!(completion.is_completion_approval());

        let regular = ProgressEvaluation::awaiting_approval(
            PlanStep::of("budget-agent", "book it"),
            "budget: 12.50 > 10.00",
        );
        assert!(!regular.is_completion_approval());
        assert!(!ProgressEvaluation::complete("done").is_completion_approval());
    }

    #[test]
    fn test_evaluation_serde_round_trip() {
        let eval = ProgressEvaluation::stalled("weather-agent", "retry", "no new information");
        let json = serde_json::to_string(&eval).unwrap();
        assert!(json.contains("\"outcome\":\"stalled\""));
        let back: ProgressEvaluation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eval);
    }
}
