//! Adaptive loop orchestrator
//!
//! Two-phase loop over the durable substrate:
//! - Outer loop (planning): gather facts → create plan → enter inner loop
//! - Inner loop (execution): evaluate progress → execute agent(s) → loop,
//!   replan, pause for approval, or finish
//!
//! The host supplies the callbacks; this module supplies the step machine,
//! the stall/replan arithmetic, and the HITL approval handling.

use async_trait::async_trait;
use std::sync::Arc;

use swarmflow_core::agent::AgentRegistry;
use swarmflow_core::effect::AgentExecutionEffect;
use swarmflow_core::state::WithAdaptiveLoopState;
use swarmflow_core::types::{
    PlanStep, ProgressEvaluation, StateProjection, WorkflowState, WorkflowStatus,
};
use swarmflow_core::workflow::{
    CommandError, EngineSettings, StepEffect, StepError, Workflow,
};

use crate::parallel;
use crate::InvalidConfig;

pub const GATHER_FACTS: &str = "gather-facts";
pub const CREATE_PLAN: &str = "create-plan";
pub const INNER_LOOP: &str = "inner-loop";
pub const EXECUTE_AGENT: &str = "execute-agent";
pub const REPLAN: &str = "replan";
pub const COMPLETE: &str = "complete";
pub const ERROR: &str = "error";

/// Immutable thresholds for the adaptive loop
#[derive(Debug, Clone)]
pub struct AdaptiveLoopConfig {
    /// Maximum turns in the inner loop before giving up
    pub max_turns: u32,
    /// Consecutive stalls before triggering a replan
    pub stall_threshold: u32,
    /// Maximum replan attempts before giving up
    pub max_replans: u32,
    /// Role queried for the single-agent shortcut and team descriptions
    pub worker_role: String,
}

impl Default for AdaptiveLoopConfig {
    fn default() -> Self {
        Self {
            max_turns: 15,
            stall_threshold: 3,
            max_replans: 2,
            worker_role: "worker".to_string(),
        }
    }
}

impl AdaptiveLoopConfig {
    /// Create a validated config; zero turn or stall limits are rejected.
    pub fn new(
        max_turns: u32,
        stall_threshold: u32,
        max_replans: u32,
    ) -> Result<Self, InvalidConfig> {
        if max_turns == 0 {
            return Err(InvalidConfig("max_turns must be > 0".to_string()));
        }
        if stall_threshold == 0 {
            return Err(InvalidConfig("stall_threshold must be > 0".to_string()));
        }
        Ok(Self {
            max_turns,
            stall_threshold,
            max_replans,
            worker_role: "worker".to_string(),
        })
    }

    pub fn with_worker_role(mut self, role: impl Into<String>) -> Self {
        self.worker_role = role.into();
        self
    }

    /// Build from the loaded configuration file.
    pub fn from_settings(config: &swarmflow_config::AdaptiveConfig) -> Result<Self, InvalidConfig> {
        Ok(Self::new(
            config.max_turns,
            config.stall_threshold,
            config.max_replans,
        )?
        .with_worker_role(config.worker_role.clone()))
    }
}

/// Host callbacks driving the adaptive loop
///
/// All callbacks take the state by value and return the updated state; the
/// substrate persists whatever comes back.
#[async_trait]
pub trait AdaptiveLoopHandler: Send + Sync + 'static {
    type State: WorkflowState + WithAdaptiveLoopState;

    /// Collect initial facts about the task; must populate `facts`.
    async fn gather_facts(&self, state: Self::State) -> Result<Self::State, StepError>;

    /// Create a plan from the gathered facts; must populate `plan`.
    async fn create_plan(&self, state: Self::State) -> Result<Self::State, StepError>;

    /// Evaluate progress and decide the next action for this turn (1-indexed).
    async fn evaluate_progress(
        &self,
        state: &Self::State,
        turn: u32,
    ) -> Result<ProgressEvaluation, StepError>;

    /// Describe how to execute one agent: an inert call plus a state update.
    ///
    /// Building the effect is cheap and performs no I/O. For parallel groups
    /// the calls run concurrently and the updates fold in submission order.
    fn execute_agent(
        &self,
        state: &Self::State,
        agent_id: &str,
        instruction: &str,
    ) -> Result<AgentExecutionEffect<Self::State>, StepError>;

    /// Produce the final answer; must set the answer and `Completed` status.
    async fn summarize(&self, state: Self::State) -> Result<Self::State, StepError>;

    /// Mark the state failed with a reason; must set `Failed` status.
    fn handle_failure(&self, state: Self::State, reason: &str) -> Self::State;

    /// Refresh facts during replanning. Defaults to `gather_facts`.
    async fn update_facts(&self, state: Self::State) -> Result<Self::State, StepError> {
        self.gather_facts(state).await
    }

    /// Refresh the plan during replanning. Defaults to `create_plan`.
    async fn update_plan(&self, state: Self::State) -> Result<Self::State, StepError> {
        self.create_plan(state).await
    }
}

/// The adaptive loop workflow definition
///
/// Owns a handler, the loop thresholds, and optionally an agent registry
/// for the single-agent shortcut and team rosters.
pub struct AdaptiveLoopWorkflow<H: AdaptiveLoopHandler> {
    handler: H,
    config: AdaptiveLoopConfig,
    settings: EngineSettings,
    registry: Option<Arc<dyn AgentRegistry>>,
}

impl<H: AdaptiveLoopHandler> AdaptiveLoopWorkflow<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            config: AdaptiveLoopConfig::default(),
            settings: EngineSettings::default(),
            registry: None,
        }
    }

    pub fn with_config(mut self, config: AdaptiveLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn AgentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &AdaptiveLoopConfig {
        &self.config
    }

    fn task_ledger(&self, state: &H::State) -> String {
        let loop_state = state.loop_state();
        let mut ledger = format!(
            "We are working to address the following user request:\n\n{}\n",
            state.task()
        );
        if let Some(registry) = &self.registry {
            ledger.push_str(&format!(
                "\nTo answer this request we have assembled the following team:\n\n{}\n",
                registry.team_description(&self.config.worker_role)
            ));
        }
        ledger.push_str(&format!(
            "\nHere is the current fact sheet:\n\n{}\n\nHere is the plan to follow:\n\n{}",
            loop_state.facts, loop_state.plan
        ));
        ledger
    }

    /// With exactly one worker registered there is nothing to orchestrate:
    /// skip the evaluator and address the task with that agent directly.
    fn single_agent_shortcut(&self, state: &H::State) -> Option<ProgressEvaluation> {
        let registry = self.registry.as_ref()?;
        let workers = registry.agents_with_role(&self.config.worker_role);
        if workers.len() != 1 {
            return None;
        }
        let agent_id = workers[0].id.clone();
        tracing::info!(agent_id = %agent_id, "single agent team, skipping evaluator");
        Some(ProgressEvaluation::continue_agent(
            agent_id,
            format!("Address the task: {}", state.task()),
        ))
    }

    async fn gather_facts_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        tracing::info!(task = %state.task(), "outer loop: gathering facts");
        let state = promote(state);
        let new_state = self.handler.gather_facts(state).await?;
        Ok(StepEffect::transition(new_state, CREATE_PLAN))
    }

    async fn create_plan_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        tracing::info!("outer loop: creating plan");
        let state = promote(state);
        let new_state = self.handler.create_plan(state).await?;

        let ledger = self.task_ledger(&new_state);
        let loop_state = new_state
            .loop_state()
            .clone()
            .add_message(format!("TASK_LEDGER: {}", ledger));
        Ok(StepEffect::transition(
            new_state.with_loop_state(loop_state),
            INNER_LOOP,
        ))
    }

    async fn inner_loop_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        // Turns are 1-indexed and counted at the top of each iteration.
        let loop_state = state.loop_state().clone().increment_turn_count();
        let state = state.with_loop_state(loop_state);
        let turn = state.loop_state().turn_count;
        tracing::info!(turn, max_turns = self.config.max_turns, "inner loop");

        if turn > self.config.max_turns {
            tracing::warn!(max_turns = self.config.max_turns, "max turns reached");
            return Ok(StepEffect::transition(
                self.handler.handle_failure(state, "Maximum turns reached"),
                COMPLETE,
            ));
        }

        let eval = match self.single_agent_shortcut(&state) {
            Some(eval) => eval,
            None => self.handler.evaluate_progress(&state, turn).await?,
        };

        match eval {
            ProgressEvaluation::AwaitingApproval { ref context, .. } => {
                tracing::info!(context = %context, "awaiting human approval");
                let loop_state = state
                    .loop_state()
                    .clone()
                    .add_message(format!("HITL_REQUEST: {}", context))
                    .with_pending_approval(eval.clone());
                let state = state
                    .with_loop_state(loop_state)
                    .with_status(WorkflowStatus::Paused);
                Ok(StepEffect::pause(state))
            }
            ProgressEvaluation::Complete { reason } => {
                tracing::info!(reason = %reason, "task complete");
                let loop_state = state
                    .loop_state()
                    .clone()
                    .add_message(format!("COMPLETE: {}", reason));
                Ok(StepEffect::transition(
                    state.with_loop_state(loop_state),
                    COMPLETE,
                ))
            }
            ProgressEvaluation::Stalled {
                agent_id,
                instruction,
                reason,
            } => {
                let loop_state = state.loop_state().clone().increment_stall_count();
                tracing::warn!(
                    stall_count = loop_state.stall_count,
                    reason = %reason,
                    "stall detected"
                );

                if loop_state.stall_count >= self.config.stall_threshold {
                    if loop_state.replan_count >= self.config.max_replans {
                        tracing::warn!(
                            max_replans = self.config.max_replans,
                            "max replans reached, giving up"
                        );
                        return Ok(StepEffect::transition(
                            self.handler.handle_failure(
                                state.with_loop_state(loop_state),
                                "Maximum replanning attempts reached",
                            ),
                            COMPLETE,
                        ));
                    }
                    tracing::info!("stall threshold reached, triggering replan");
                    return Ok(StepEffect::transition(
                        state.with_loop_state(loop_state.start_replanning()),
                        REPLAN,
                    ));
                }

                // Below the threshold: keep the stall count and try the
                // agent the evaluator named.
                let loop_state = loop_state
                    .add_message(format!("ORCHESTRATOR: {}", instruction))
                    .with_pending_agent(agent_id, instruction);
                Ok(StepEffect::transition(
                    state.with_loop_state(loop_state),
                    EXECUTE_AGENT,
                ))
            }
            ProgressEvaluation::ContinueAgent {
                agent_id,
                instruction,
            } => {
                tracing::info!(agent_id = %agent_id, "next agent selected");
                let loop_state = state
                    .loop_state()
                    .clone()
                    .reset_stall_count()
                    .add_message(format!("ORCHESTRATOR: {}", instruction))
                    .with_pending_agent(agent_id, instruction);
                Ok(StepEffect::transition(
                    state.with_loop_state(loop_state),
                    EXECUTE_AGENT,
                ))
            }
            ProgressEvaluation::ContinueStep { step } => {
                tracing::info!(agents = step.agent_count(), "next step selected");
                let loop_state = state
                    .loop_state()
                    .clone()
                    .reset_stall_count()
                    .add_message("ORCHESTRATOR: Execute next step")
                    .with_pending_step(step);
                Ok(StepEffect::transition(
                    state.with_loop_state(loop_state),
                    EXECUTE_AGENT,
                ))
            }
        }
    }

    async fn execute_agent_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        let Some(pending) = state.loop_state().pending_execution.clone() else {
            tracing::error!("no pending execution found in state");
            return Ok(StepEffect::transition(
                self.handler
                    .handle_failure(state, "Internal error: no pending execution"),
                ERROR,
            ));
        };

        let new_state = match pending.step {
            PlanStep::Sequential(seq) => {
                tracing::info!(agent_id = %seq.agent_id, "executing agent");
                let effect =
                    self.handler
                        .execute_agent(&state, &seq.agent_id, &seq.instruction)?;
                effect.apply(state).await?
            }
            PlanStep::Parallel(group) => {
                tracing::info!(agents = group.steps.len(), "executing parallel group");
                let mut effects = Vec::with_capacity(group.steps.len());
                for seq in &group.steps {
                    effects.push(self.handler.execute_agent(
                        &state,
                        &seq.agent_id,
                        &seq.instruction,
                    )?);
                }
                parallel::execute_all(effects, state).await?
            }
        };

        let loop_state = new_state.loop_state().clone().clear_pending_execution();
        Ok(StepEffect::transition(
            new_state.with_loop_state(loop_state),
            INNER_LOOP,
        ))
    }

    async fn replan_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        tracing::info!(
            replan_count = state.loop_state().replan_count,
            max_replans = self.config.max_replans,
            "replanning"
        );

        let state = self.handler.update_facts(state).await?;
        let new_state = self.handler.update_plan(state).await?;

        let ledger = self.task_ledger(&new_state);
        let loop_state = new_state
            .loop_state()
            .clone()
            .add_message(format!("UPDATED_TASK_LEDGER: {}", ledger));
        Ok(StepEffect::transition(
            new_state.with_loop_state(loop_state),
            INNER_LOOP,
        ))
    }

    async fn complete_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        if state.status() == WorkflowStatus::Failed {
            tracing::warn!("workflow failed, skipping summarize");
            return Ok(StepEffect::end(state));
        }

        tracing::info!("generating final answer");
        let new_state = self.handler.summarize(state).await?;
        Ok(StepEffect::pause(new_state))
    }

    fn error_step(&self, state: H::State) -> StepEffect<H::State> {
        tracing::error!("workflow error");
        StepEffect::end(
            self.handler
                .handle_failure(state, "Workflow encountered an error"),
        )
    }
}

#[async_trait]
impl<H: AdaptiveLoopHandler> Workflow for AdaptiveLoopWorkflow<H> {
    type State = H::State;

    fn initial_step(&self) -> &'static str {
        GATHER_FACTS
    }

    fn settings(&self) -> EngineSettings {
        self.settings.clone()
    }

    async fn run_step(
        &self,
        step: &str,
        state: Self::State,
    ) -> Result<StepEffect<Self::State>, StepError> {
        match step {
            GATHER_FACTS => self.gather_facts_step(state).await,
            CREATE_PLAN => self.create_plan_step(state).await,
            INNER_LOOP => self.inner_loop_step(state).await,
            EXECUTE_AGENT => self.execute_agent_step(state).await,
            REPLAN => self.replan_step(state).await,
            COMPLETE => self.complete_step(state).await,
            ERROR => Ok(self.error_step(state)),
            other => Err(StepError::UnknownStep(other.to_string())),
        }
    }

    fn apply_failure(&self, state: Self::State, reason: &str) -> Self::State {
        self.handler.handle_failure(state, reason)
    }

    fn handle_approval(
        &self,
        state: Self::State,
        approval_id: &str,
        approved: bool,
    ) -> Result<(Self::State, Option<&'static str>), CommandError> {
        let Some(pending) = state.loop_state().pending_approval.clone() else {
            return Err(CommandError::NoPendingApproval);
        };
        if pending.approval_id != approval_id {
            return Err(CommandError::ApprovalIdMismatch);
        }

        let context = match &pending.evaluation {
            ProgressEvaluation::AwaitingApproval { context, .. } => context.clone(),
            _ => String::new(),
        };

        if approved {
            tracing::info!(context = %context, "hitl approval granted");
            let mut loop_state = state
                .loop_state()
                .clone()
                .add_message(format!("HITL_APPROVED: {}", context))
                .clear_pending_approval();

            if pending.evaluation.is_completion_approval() {
                let state = state
                    .with_loop_state(loop_state)
                    .with_status(WorkflowStatus::Executing);
                return Ok((state, Some(COMPLETE)));
            }

            if let ProgressEvaluation::AwaitingApproval {
                next_step: Some(step),
                ..
            } = pending.evaluation
            {
                loop_state = loop_state.with_pending_step(step);
            }
            let state = state
                .with_loop_state(loop_state)
                .with_status(WorkflowStatus::Executing);
            Ok((state, Some(EXECUTE_AGENT)))
        } else {
            tracing::info!(context = %context, "hitl approval rejected");
            let loop_state = state.loop_state().clone().clear_pending_approval();
            let state = self.handler.handle_failure(
                state.with_loop_state(loop_state),
                &format!("Rejected by human: {}", context),
            );
            Ok((state, Some(COMPLETE)))
        }
    }

    fn resume_step(
        &self,
        state: Self::State,
        message: &str,
    ) -> Result<(Self::State, &'static str), CommandError> {
        if state.status() != WorkflowStatus::Paused
            || state.loop_state().pending_approval.is_some()
        {
            // An approval pause is only released through approve().
            return Err(CommandError::NotPaused);
        }
        let loop_state = state
            .loop_state()
            .clone()
            .add_message(format!("ORCHESTRATOR: {}", message));
        Ok((
            state
                .with_loop_state(loop_state)
                .with_status(WorkflowStatus::Executing),
            INNER_LOOP,
        ))
    }

    fn project(&self, state: &Self::State) -> StateProjection {
        let loop_state = state.loop_state();
        let mut projection = StateProjection::new(state.task(), state.status());
        projection.turn_count = Some(loop_state.turn_count);
        projection.max_turns = Some(self.config.max_turns);
        projection.pending_approval_context =
            loop_state
                .pending_approval
                .as_ref()
                .and_then(|p| match &p.evaluation {
                    ProgressEvaluation::AwaitingApproval { context, .. } => Some(context.clone()),
                    _ => None,
                });
        projection.message_history = loop_state.message_history.clone();
        projection.agent_responses = loop_state.agent_responses.clone();
        projection
    }
}

fn promote<S: WorkflowState>(state: S) -> S {
    if state.status() == WorkflowStatus::Started {
        state.with_status(WorkflowStatus::Executing)
    } else {
        state
    }
}
