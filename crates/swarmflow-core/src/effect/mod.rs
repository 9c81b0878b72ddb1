//! Deferred agent-execution effect
//!
//! A pair of (inert call, state update). Effects are collected first, their
//! calls dispatched — concurrently for parallel groups — and the updates
//! folded into the state serially afterwards. Collecting an effect performs
//! no work: the call future is not polled until the executor submits it.

use std::future::Future;
use std::pin::Pin;

use crate::agent::AgentError;

/// Boxed agent call; resolves to the agent's response string
pub type AgentCall = Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send>>;

/// Boxed state update applied once the call resolves
pub type StateUpdate<S> = Box<dyn FnOnce(String, S) -> S + Send>;

/// Effect describing how to execute an agent and fold its response into state
pub struct AgentExecutionEffect<S> {
    call: AgentCall,
    update: StateUpdate<S>,
}

impl<S> AgentExecutionEffect<S> {
    /// Build an effect from the agent call and the state update
    ///
    /// The call may run concurrently with other calls in a parallel group;
    /// the update runs serially after all calls in the group resolve.
    pub fn new<F, U>(call: F, update: U) -> Self
    where
        F: Future<Output = Result<String, AgentError>> + Send + 'static,
        U: FnOnce(String, S) -> S + Send + 'static,
    {
        Self {
            call: Box::pin(call),
            update: Box::new(update),
        }
    }

    /// Split into the call future and the update closure
    pub fn into_parts(self) -> (AgentCall, StateUpdate<S>) {
        (self.call, self.update)
    }

    /// Execute the call and apply the update immediately (sequential path)
    pub async fn apply(self, state: S) -> Result<S, AgentError> {
        let response = self.call.await?;
        Ok((self.update)(response, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_effect_applies_response_to_state() {
        tokio_test::block_on(async {
            let effect = AgentExecutionEffect::new(
                async { Ok("rainy".to_string()) },
                |response, state: Vec<String>| {
                    let mut state = state;
                    state.push(response);
                    state
                },
            );

            let state = effect.apply(vec!["prior".to_string()]).await.unwrap();
            assert_eq!(state, vec!["prior".to_string(), "rainy".to_string()]);
        });
    }

    #[test]
    fn test_collecting_an_effect_does_not_invoke_the_call() {
        tokio_test::block_on(async {
            let called = Arc::new(AtomicBool::new(false));
            let flag = called.clone();
            let effect = AgentExecutionEffect::new(
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok("ok".to_string())
                },
                |_, state: ()| state,
            );

            assert!(!called.load(Ordering::SeqCst));
            effect.apply(()).await.unwrap();
            assert!(called.load(Ordering::SeqCst));
        });
    }

    #[test]
    fn test_call_error_skips_update() {
        tokio_test::block_on(async {
            let effect = AgentExecutionEffect::new(
                async { Err(AgentError::Call("boom".to_string())) },
                |_, _state: u32| panic!("update must not run on call failure"),
            );

            let result = effect.apply(7).await;
            assert!(matches!(result, Err(AgentError::Call(_))));
        });
    }
}
