//! Parallel execution primitive
//!
//! Given the effects collected for a parallel group, submit all calls
//! concurrently, join them, and fold the state updates in submission order.
//! Completion order is free; application order is not. Any call error fails
//! the whole group with no partial state application — re-execution is the
//! parent step's retry policy's business.

use futures_util::stream::{FuturesUnordered, StreamExt};

use swarmflow_core::effect::AgentExecutionEffect;
use swarmflow_core::workflow::StepError;

/// Execute a group of effects concurrently and fold updates serially.
///
/// In-flight parallelism is bounded by the group size: one future per
/// effect, nothing more. Dropping the returned future (step timeout,
/// cancellation) drops the in-flight calls with it.
pub async fn execute_all<S>(
    effects: Vec<AgentExecutionEffect<S>>,
    state: S,
) -> Result<S, StepError> {
    let mut updates = Vec::with_capacity(effects.len());
    let mut calls = FuturesUnordered::new();
    for (index, effect) in effects.into_iter().enumerate() {
        let (call, update) = effect.into_parts();
        updates.push(update);
        calls.push(async move { (index, call.await) });
    }

    let mut responses: Vec<Option<String>> = (0..updates.len()).map(|_| None).collect();
    while let Some((index, result)) = calls.next().await {
        match result {
            Ok(response) => responses[index] = Some(response),
            Err(error) => return Err(error.into()),
        }
    }

    let mut state = state;
    for (update, response) in updates.into_iter().zip(responses) {
        let response = response.ok_or_else(|| {
            StepError::InvalidState("parallel call resolved without a response".to_string())
        })?;
        state = update(response, state);
    }
    Ok(state)
}
