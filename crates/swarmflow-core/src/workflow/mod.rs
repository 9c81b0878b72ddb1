//! Workflow contract
//!
//! A workflow is a set of named steps over a persisted state. Each step
//! returns a step effect: the new state plus what happens next (transition,
//! pause, or end). The engine in swarmflow-runtime drives this contract;
//! step names are plain strings so they persist and survive restarts.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::agent::AgentError;
use crate::store::StoreError;
use crate::types::{StateProjection, WorkflowState, WorkflowStatus};

/// Default per-step deadline
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);
/// Default retry budget per step (retries after the initial attempt)
pub const DEFAULT_STEP_RETRIES: u32 = 1;
/// Default failover step on retry exhaustion
pub const DEFAULT_FAILOVER_STEP: &str = "error";

/// Engine-level defaults for step execution
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline applied to each step
    pub default_step_timeout: Duration,
    /// Retries after the initial attempt
    pub default_step_retries: u32,
    /// Step to transition to when a step exhausts its retries
    pub failover_step: &'static str,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_step_timeout: DEFAULT_STEP_TIMEOUT,
            default_step_retries: DEFAULT_STEP_RETRIES,
            failover_step: DEFAULT_FAILOVER_STEP,
        }
    }
}

impl EngineSettings {
    /// Policy derived from the defaults
    pub fn default_policy(&self) -> StepPolicy {
        StepPolicy {
            timeout: self.default_step_timeout,
            max_retries: self.default_step_retries,
            failover_to: self.failover_step,
        }
    }
}

/// Per-step execution policy
#[derive(Debug, Clone)]
pub struct StepPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub failover_to: &'static str,
}

/// What happens after a step completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    /// Run the named step next
    Transition(&'static str),
    /// Persist state and schedule nothing; a command supplies the next step
    Pause,
    /// Persist state and finish the instance
    End,
}

/// A step's result: the new state and the control decision
pub struct StepEffect<S> {
    pub state: S,
    pub control: StepControl,
}

impl<S> StepEffect<S> {
    pub fn transition(state: S, next: &'static str) -> Self {
        Self {
            state,
            control: StepControl::Transition(next),
        }
    }

    pub fn pause(state: S) -> Self {
        Self {
            state,
            control: StepControl::Pause,
        }
    }

    pub fn end(state: S) -> Self {
        Self {
            state,
            control: StepControl::End,
        }
    }
}

/// Failures raised while running a step
///
/// All of these are transient from the substrate's point of view: the step
/// is retried up to its policy budget, then control moves to the failover
/// step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("handler error: {0}")]
    Handler(String),
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Synchronous command-surface errors; state is unchanged when these occur
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("workflow '{0}' already started")]
    AlreadyStarted(String),
    #[error("workflow '{0}' not started")]
    NotStarted(String),
    #[error("workflow is not paused")]
    NotPaused,
    #[error("workflow not completed yet, status: {0:?}")]
    NotCompleted(WorkflowStatus),
    #[error("no pending approval")]
    NoPendingApproval,
    #[error("approval id mismatch")]
    ApprovalIdMismatch,
    #[error("workflow '{0}' is stopped")]
    Stopped(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("state serialization error: {0}")]
    Serialization(String),
}

/// The contract the engine drives
///
/// Implementations are long-lived and shared across instances; all per-run
/// data lives in the state.
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    type State: WorkflowState;

    /// The step a fresh instance starts at
    fn initial_step(&self) -> &'static str;

    /// Engine defaults for this workflow
    fn settings(&self) -> EngineSettings {
        EngineSettings::default()
    }

    /// Per-step policy; defaults to the workflow settings
    fn step_policy(&self, _step: &str) -> StepPolicy {
        self.settings().default_policy()
    }

    /// Run one named step against the current state
    async fn run_step(
        &self,
        step: &str,
        state: Self::State,
    ) -> Result<StepEffect<Self::State>, StepError>;

    /// Mark the state failed with a reason
    ///
    /// Used by the engine when the failover step itself cannot run.
    fn apply_failure(&self, state: Self::State, reason: &str) -> Self::State;

    /// Handle an approval decision for a paused instance
    ///
    /// Returns the updated state and the step to resume at; `None` keeps the
    /// instance paused.
    fn handle_approval(
        &self,
        _state: Self::State,
        _approval_id: &str,
        _approved: bool,
    ) -> Result<(Self::State, Option<&'static str>), CommandError> {
        Err(CommandError::NoPendingApproval)
    }

    /// Handle a resume command for a paused instance
    fn resume_step(
        &self,
        _state: Self::State,
        _message: &str,
    ) -> Result<(Self::State, &'static str), CommandError> {
        Err(CommandError::NotPaused)
    }

    /// Status projection for read queries
    fn project(&self, state: &Self::State) -> StateProjection {
        StateProjection::new(state.task(), state.status())
    }
}
