//! Sequential plan orchestrator
//!
//! Linear execution over the durable substrate: create a plan, drain the
//! step queue (honoring parallel groups), summarize. No progress
//! evaluation, no stall detection, no replanning.

use async_trait::async_trait;

use swarmflow_core::effect::AgentExecutionEffect;
use swarmflow_core::state::WithSequentialPlanState;
use swarmflow_core::types::{PlanStep, StateProjection, WorkflowState, WorkflowStatus};
use swarmflow_core::workflow::{EngineSettings, StepEffect, StepError, Workflow};

use crate::parallel;
use crate::InvalidConfig;

pub const CREATE_PLAN: &str = "create-plan";
pub const EXECUTE_PLAN: &str = "execute-plan";
pub const SUMMARIZE: &str = "summarize";
pub const ERROR: &str = "error";

/// Immutable limits for the sequential plan
#[derive(Debug, Clone)]
pub struct SequentialPlanConfig {
    /// Maximum steps a plan may contain
    pub max_steps: usize,
}

impl Default for SequentialPlanConfig {
    fn default() -> Self {
        Self { max_steps: 50 }
    }
}

impl SequentialPlanConfig {
    /// Create a validated config; a zero step limit is rejected.
    pub fn new(max_steps: usize) -> Result<Self, InvalidConfig> {
        if max_steps == 0 {
            return Err(InvalidConfig("max_steps must be > 0".to_string()));
        }
        Ok(Self { max_steps })
    }

    /// Build from the loaded configuration file.
    pub fn from_settings(
        config: &swarmflow_config::SequentialConfig,
    ) -> Result<Self, InvalidConfig> {
        Self::new(config.max_steps)
    }
}

/// Host callbacks driving the sequential plan
#[async_trait]
pub trait SequentialPlanHandler: Send + Sync + 'static {
    type State: WorkflowState + WithSequentialPlanState;

    /// Create the execution plan; must populate the remaining-steps queue.
    async fn create_plan(&self, state: Self::State) -> Result<Self::State, StepError>;

    /// Describe how to execute one agent: an inert call plus a state update.
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
}

/// The sequential plan workflow definition
pub struct SequentialPlanWorkflow<H: SequentialPlanHandler> {
    handler: H,
    config: SequentialPlanConfig,
    settings: EngineSettings,
}

impl<H: SequentialPlanHandler> SequentialPlanWorkflow<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            config: SequentialPlanConfig::default(),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_config(mut self, config: SequentialPlanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn create_plan_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        tracing::info!("creating execution plan");
        let state = if state.status() == WorkflowStatus::Started {
            state.with_status(WorkflowStatus::Executing)
        } else {
            state
        };
        let new_state = self.handler.create_plan(state).await?;
        let step_count = new_state.plan_state().len();
        tracing::info!(step_count, "plan created");

        if step_count == 0 {
            tracing::warn!("plan is empty, cannot proceed");
            return Ok(StepEffect::end(
                self.handler
                    .handle_failure(new_state, "Plan creation resulted in no steps"),
            ));
        }

        if step_count > self.config.max_steps {
            tracing::warn!(
                step_count,
                max_steps = self.config.max_steps,
                "plan exceeds step limit"
            );
            return Ok(StepEffect::end(
                self.handler
                    .handle_failure(new_state, "Plan exceeds maximum allowed steps"),
            ));
        }

        Ok(StepEffect::transition(new_state, EXECUTE_PLAN))
    }

    async fn execute_plan_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        let Some(step) = state.plan_state().next_step().cloned() else {
            return Ok(StepEffect::transition(state, SUMMARIZE));
        };

        let new_state = match step {
            PlanStep::Sequential(seq) => {
                tracing::info!(agent_id = %seq.agent_id, "executing sequential step");
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

        // Drop the head atomically with the state update from this step.
        let plan_state = new_state.plan_state().clone().remove_first_step();
        let remaining = plan_state.len();
        let new_state = new_state.with_plan_state(plan_state);

        if remaining > 0 {
            tracing::info!(remaining, "steps remaining");
            Ok(StepEffect::transition(new_state, EXECUTE_PLAN))
        } else {
            tracing::info!("all steps executed, proceeding to summarize");
            Ok(StepEffect::transition(new_state, SUMMARIZE))
        }
    }

    async fn summarize_step(&self, state: H::State) -> Result<StepEffect<H::State>, StepError> {
        if state.status() == WorkflowStatus::Failed {
            return Ok(StepEffect::end(state));
        }
        tracing::info!("generating final answer");
        let new_state = self.handler.summarize(state).await?;
        Ok(StepEffect::pause(new_state))
    }
}

#[async_trait]
impl<H: SequentialPlanHandler> Workflow for SequentialPlanWorkflow<H> {
    type State = H::State;

    fn initial_step(&self) -> &'static str {
        CREATE_PLAN
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
            CREATE_PLAN => self.create_plan_step(state).await,
            EXECUTE_PLAN => self.execute_plan_step(state).await,
            SUMMARIZE => self.summarize_step(state).await,
            ERROR => {
                tracing::error!("workflow error");
                Ok(StepEffect::end(
                    self.handler
                        .handle_failure(state, "Workflow encountered an error"),
                ))
            }
            other => Err(StepError::UnknownStep(other.to_string())),
        }
    }

    fn apply_failure(&self, state: Self::State, reason: &str) -> Self::State {
        self.handler.handle_failure(state, reason)
    }

    fn project(&self, state: &Self::State) -> StateProjection {
        let mut projection = StateProjection::new(state.task(), state.status());
        projection.remaining_steps = Some(state.plan_state().len());
        projection.message_history = state.message_history().to_vec();
        projection
    }
}
