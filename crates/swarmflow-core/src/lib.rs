//! # Swarmflow Core
//!
//! Core abstractions and deterministic logic for the Swarmflow orchestration
//! runtime.
//!
//! This crate contains:
//! - Plan / progress-evaluation / status definitions
//! - Loop and plan state holders composed into host workflow states
//! - The workflow/step contract the substrate drives
//! - Agent registry and invoker seams
//! - The instance persistence contract
//!
//! This crate does NOT care about:
//! - How agents talk to their models
//! - How the command surface is transported (HTTP, RPC, in-process)
//! - Where instance records are stored (see swarmflow-stores)

pub mod agent;
pub mod effect;
pub mod state;
pub mod store;
pub mod types;
pub mod workflow;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{
        AgentError, AgentInfo, AgentInvoker, AgentRegistry, AgentRequest, InMemoryAgentRegistry,
    };
    pub use crate::effect::AgentExecutionEffect;
    pub use crate::state::{
        AdaptiveLoopState, PendingApproval, PendingExecution, SequentialPlanState,
        WithAdaptiveLoopState, WithSequentialPlanState,
    };
    pub use crate::store::{InstanceRecord, InstanceStore, StoreError};
    pub use crate::types::{
        Budget, ParallelGroup, PlanStep, ProgressEvaluation, SequentialStep, StateProjection,
        WorkflowState, WorkflowStatus,
    };
    pub use crate::workflow::{
        CommandError, EngineSettings, StepControl, StepEffect, StepError, StepPolicy, Workflow,
    };
}

// Re-export key types at crate root
pub use agent::{AgentError, AgentInfo, AgentInvoker, AgentRegistry, AgentRequest};
pub use effect::AgentExecutionEffect;
pub use state::{AdaptiveLoopState, SequentialPlanState};
pub use store::{InstanceRecord, InstanceStore, StoreError};
pub use types::{PlanStep, ProgressEvaluation, WorkflowState, WorkflowStatus};
pub use workflow::{CommandError, StepControl, StepEffect, StepError, Workflow};
