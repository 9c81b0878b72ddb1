//! Workflow engine - durable step scheduling over an instance store
//!
//! Each instance is a serial actor: one driver task runs its steps in order,
//! persisting `(state, next_step)` atomically after every step. Commands
//! mutate the persisted record and re-attach a driver where needed. A stop
//! request is honored at the next step boundary, never mid-step.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use swarmflow_core::store::{InstanceRecord, InstanceStore, StoreError};
use swarmflow_core::types::{StateProjection, WorkflowState, WorkflowStatus};
use swarmflow_core::workflow::{
    CommandError, EngineSettings, StepControl, StepEffect, Workflow, DEFAULT_FAILOVER_STEP,
};

/// Build engine settings from the loaded configuration file.
pub fn settings_from_config(config: &swarmflow_config::EngineConfig) -> EngineSettings {
    EngineSettings {
        default_step_timeout: Duration::from_secs(config.step_timeout_secs),
        default_step_retries: config.step_retries,
        failover_step: DEFAULT_FAILOVER_STEP,
    }
}

struct EngineInner<W: Workflow> {
    workflow: W,
    store: Arc<dyn InstanceStore>,
    drivers: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Durable workflow engine for one workflow definition.
///
/// Cheap to clone; clones share the same store and driver set. Instances of
/// distinct ids run in parallel, steps of one instance never overlap.
pub struct WorkflowEngine<W: Workflow> {
    inner: Arc<EngineInner<W>>,
}

impl<W: Workflow> Clone for WorkflowEngine<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: Workflow> WorkflowEngine<W> {
    /// Create an engine over the given store.
    pub fn new(workflow: W, store: Arc<dyn InstanceStore>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                workflow,
                store,
                drivers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start a new instance with the given initial state.
    ///
    /// Idempotent on the instance id: a second start fails with
    /// `AlreadyStarted` and leaves the existing instance untouched.
    pub async fn start(&self, instance_id: &str, state: W::State) -> Result<(), CommandError> {
        let value = encode_state(&state)?;
        let record = InstanceRecord::new(
            instance_id,
            value,
            Some(self.inner.workflow.initial_step().to_string()),
        );
        match self.inner.store.create(&record).await {
            Ok(()) => {
                tracing::info!(instance_id = %instance_id, "workflow instance started");
                self.ensure_driver(instance_id).await;
                Ok(())
            }
            Err(StoreError::AlreadyExists(id)) => Err(CommandError::AlreadyStarted(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Handle an approval decision for a paused instance.
    pub async fn approve(
        &self,
        instance_id: &str,
        approval_id: &str,
        approved: bool,
    ) -> Result<(), CommandError> {
        let mut record = self.load_record(instance_id).await?;
        let key = command_key("approve", &format!("{}:{}", approval_id, approved));
        if record.command_applied(&key) {
            return Ok(());
        }

        let state = decode_state::<W>(&record)?;
        if state.status() == WorkflowStatus::Stopped {
            return Err(CommandError::Stopped(instance_id.to_string()));
        }
        let (new_state, next) = self
            .inner
            .workflow
            .handle_approval(state, approval_id, approved)?;

        record.mark_command(key);
        record.advance(encode_state(&new_state)?, next.map(str::to_string));
        self.inner.store.save(&record).await?;

        if next.is_some() {
            self.ensure_driver(instance_id).await;
        }
        Ok(())
    }

    /// Resume a paused instance with a free-form message.
    pub async fn resume(&self, instance_id: &str, message: &str) -> Result<(), CommandError> {
        let mut record = self.load_record(instance_id).await?;
        let key = command_key("resume", message);
        if record.command_applied(&key) {
            return Ok(());
        }

        let state = decode_state::<W>(&record)?;
        if state.status() == WorkflowStatus::Stopped {
            return Err(CommandError::Stopped(instance_id.to_string()));
        }
        let (new_state, next) = self.inner.workflow.resume_step(state, message)?;

        record.mark_command(key);
        record.advance(encode_state(&new_state)?, Some(next.to_string()));
        self.inner.store.save(&record).await?;
        self.ensure_driver(instance_id).await;
        Ok(())
    }

    /// Request a stop. Honored at the next step boundary; for a paused or
    /// driverless instance the boundary is now.
    pub async fn stop(&self, instance_id: &str, reason: &str) -> Result<(), CommandError> {
        let mut record = self.load_record(instance_id).await?;
        let key = command_key("stop", reason);
        if record.command_applied(&key) {
            return Ok(());
        }

        let state = decode_state::<W>(&record)?;
        record.mark_command(key);
        if state.status().is_terminal() {
            self.inner.store.save(&record).await?;
            return Ok(());
        }

        record.request_stop();
        let driver_active = {
            let drivers = self.inner.drivers.lock().await;
            drivers
                .get(instance_id)
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
        };
        if !driver_active || record.next_step.is_none() {
            let stopped = state.with_status(WorkflowStatus::Stopped);
            record.advance(encode_state(&stopped)?, None);
            tracing::info!(instance_id = %instance_id, reason = %reason, "workflow stopped");
        } else {
            tracing::info!(instance_id = %instance_id, reason = %reason, "stop requested");
        }
        self.inner.store.save(&record).await?;
        Ok(())
    }

    /// Re-attach a driver to a persisted instance after a restart.
    pub async fn recover(&self, instance_id: &str) -> Result<(), CommandError> {
        let record = self.load_record(instance_id).await?;
        if record.next_step.is_some() || record.stop_requested {
            self.ensure_driver(instance_id).await;
        }
        Ok(())
    }

    /// Full state of an instance (read-only).
    pub async fn get_state(&self, instance_id: &str) -> Result<W::State, CommandError> {
        let record = self.load_record(instance_id).await?;
        decode_state::<W>(&record)
    }

    /// Transport-agnostic status projection of an instance.
    pub async fn get_projection(&self, instance_id: &str) -> Result<StateProjection, CommandError> {
        let state = self.get_state(instance_id).await?;
        Ok(self.inner.workflow.project(&state))
    }

    /// The final answer of a completed instance.
    pub async fn get_answer(&self, instance_id: &str) -> Result<String, CommandError> {
        let state = self.get_state(instance_id).await?;
        if state.status() != WorkflowStatus::Completed {
            return Err(CommandError::NotCompleted(state.status()));
        }
        Ok(state.final_answer().unwrap_or_else(|| {
            "Workflow completed but no final answer found".to_string()
        }))
    }

    async fn load_record(&self, instance_id: &str) -> Result<InstanceRecord, CommandError> {
        self.inner
            .store
            .load(instance_id)
            .await?
            .ok_or_else(|| CommandError::NotStarted(instance_id.to_string()))
    }

    async fn ensure_driver(&self, instance_id: &str) {
        let mut drivers = self.inner.drivers.lock().await;
        if let Some(handle) = drivers.get(instance_id) {
            if !handle.is_finished() {
                return;
            }
        }
        let inner = self.inner.clone();
        let id = instance_id.to_string();
        drivers.insert(instance_id.to_string(), tokio::spawn(drive(inner, id)));
    }
}

/// Drive an instance until it pauses, ends, or hits a fatal substrate error.
async fn drive<W: Workflow>(inner: Arc<EngineInner<W>>, instance_id: String) {
    loop {
        let record = match inner.store.load(&instance_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(error) => {
                tracing::error!(instance_id = %instance_id, error = %error, "failed to load instance record");
                return;
            }
        };

        let state: W::State = match serde_json::from_value(record.state.clone()) {
            Ok(state) => state,
            Err(error) => {
                tracing::error!(instance_id = %instance_id, error = %error, "persisted state is not decodable");
                return;
            }
        };

        if record.stop_requested {
            if !state.status().is_terminal() {
                let stopped = state.with_status(WorkflowStatus::Stopped);
                if let Err(error) = inner.persist_step(&instance_id, &stopped, None).await {
                    tracing::error!(instance_id = %instance_id, error = %error, "failed to persist stopped state");
                }
                tracing::info!(instance_id = %instance_id, "workflow stopped at step boundary");
            }
            return;
        }

        let Some(step) = record.next_step.clone() else {
            return;
        };

        let policy = inner.workflow.step_policy(&step);
        let mut attempt: u32 = 0;
        let effect = loop {
            let run = tokio::time::timeout(
                policy.timeout,
                inner.workflow.run_step(&step, state.clone()),
            )
            .await;
            match run {
                Ok(Ok(effect)) => break Some(effect),
                Ok(Err(error)) => {
                    tracing::warn!(
                        instance_id = %instance_id,
                        step = %step,
                        attempt,
                        error = %error,
                        "step failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        instance_id = %instance_id,
                        step = %step,
                        attempt,
                        timeout_ms = policy.timeout.as_millis() as u64,
                        "step timed out"
                    );
                }
            }
            if attempt >= policy.max_retries {
                break None;
            }
            attempt += 1;
        };

        match effect {
            Some(StepEffect {
                state: new_state,
                control,
            }) => {
                let next = match control {
                    StepControl::Transition(next) => Some(next),
                    StepControl::Pause | StepControl::End => None,
                };
                if let Err(error) = inner.persist_step(&instance_id, &new_state, next).await {
                    tracing::error!(instance_id = %instance_id, error = %error, "failed to persist step result");
                    return;
                }
                match control {
                    StepControl::Transition(next) => {
                        tracing::debug!(instance_id = %instance_id, step = %step, next = %next, "step completed");
                    }
                    StepControl::Pause => {
                        tracing::info!(instance_id = %instance_id, step = %step, "workflow paused");
                        return;
                    }
                    StepControl::End => {
                        tracing::info!(instance_id = %instance_id, step = %step, "workflow ended");
                        return;
                    }
                }
            }
            None => {
                if step == policy.failover_to {
                    // The failover step itself is broken; force a terminal failure.
                    let failed = inner
                        .workflow
                        .apply_failure(state, "Workflow encountered an error")
                        .with_status(WorkflowStatus::Failed);
                    if let Err(error) = inner.persist_step(&instance_id, &failed, None).await {
                        tracing::error!(instance_id = %instance_id, error = %error, "failed to persist forced failure");
                    }
                    return;
                }
                tracing::warn!(
                    instance_id = %instance_id,
                    step = %step,
                    failover = %policy.failover_to,
                    "retries exhausted, transitioning to failover step"
                );
                if let Err(error) = inner
                    .persist_step(&instance_id, &state, Some(policy.failover_to))
                    .await
                {
                    tracing::error!(instance_id = %instance_id, error = %error, "failed to persist failover transition");
                    return;
                }
            }
        }
    }
}

impl<W: Workflow> EngineInner<W> {
    /// Persist a completed step onto a freshly loaded record, so concurrent
    /// command writes (stop flags, idempotency keys) are not clobbered.
    async fn persist_step(
        &self,
        instance_id: &str,
        state: &W::State,
        next_step: Option<&'static str>,
    ) -> Result<(), StoreError> {
        let mut record = self
            .store
            .load(instance_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(instance_id.to_string()))?;
        let value = serde_json::to_value(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        record.advance(value, next_step.map(str::to_string));
        self.store.save(&record).await
    }
}

fn encode_state<S: serde::Serialize>(state: &S) -> Result<serde_json::Value, CommandError> {
    serde_json::to_value(state).map_err(|e| CommandError::Serialization(e.to_string()))
}

fn decode_state<W: Workflow>(record: &InstanceRecord) -> Result<W::State, CommandError> {
    serde_json::from_value(record.state.clone())
        .map_err(|e| CommandError::Serialization(e.to_string()))
}

fn command_key(name: &str, payload: &str) -> String {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    format!("{}:{:016x}", name, hasher.finish())
}
