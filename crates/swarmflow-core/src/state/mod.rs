//! Orchestration state holders
//!
//! Framework-owned state composed into host workflow states:
//! - `AdaptiveLoopState`: facts, plan, audit history, counters, pendings
//! - `SequentialPlanState`: the remaining-steps queue
//!
//! Host states implement the matching `With*State` trait so the orchestrators
//! can read and replace the composed piece without knowing the host shape.

mod adaptive;
mod sequential;

pub use adaptive::{AdaptiveLoopState, PendingApproval, PendingExecution, WithAdaptiveLoopState};
pub use sequential::{SequentialPlanState, WithSequentialPlanState};
