//! Agent registry and invoker seams
//!
//! The host application supplies both: a read-only registry for role lookup
//! and an invoker that dispatches a request to an agent by string id. The
//! request/response pair is erased to strings; the LLM boundary serializes
//! anyway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Agent lookup entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub description: String,
}

impl AgentInfo {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Request passed to an agent invocation
///
/// The session id is carried through untouched; conversational memory is the
/// host's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub session_id: String,
    pub message: String,
}

impl AgentRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
        }
    }
}

/// Agent invocation errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent '{0}' not found")]
    NotFound(String),
    #[error("agent call failed: {0}")]
    Call(String),
}

/// Read-only role lookup supplied by the host
pub trait AgentRegistry: Send + Sync {
    /// Agents registered under the given role
    fn agents_with_role(&self, role: &str) -> Vec<AgentInfo>;

    /// Human-readable team roster for planner prompts
    fn team_description(&self, role: &str) -> String {
        self.agents_with_role(role)
            .iter()
            .map(|info| format!("{}: {}", info.id, info.description.replace('\n', " ")))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Dynamic agent dispatch by string id
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, agent_id: &str, request: AgentRequest) -> Result<String, AgentError>;
}

/// In-memory registry keyed by role
pub struct InMemoryAgentRegistry {
    agents: HashMap<String, Vec<AgentInfo>>,
}

impl InMemoryAgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register an agent under a role
    pub fn register(&mut self, role: impl Into<String>, info: AgentInfo) {
        self.agents.entry(role.into()).or_default().push(info);
    }
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry for InMemoryAgentRegistry {
    fn agents_with_role(&self, role: &str) -> Vec<AgentInfo> {
        self.agents.get(role).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_lookup() {
        let mut registry = InMemoryAgentRegistry::new();
        registry.register("worker", AgentInfo::new("weather-agent", "Weather forecasts"));
        registry.register("worker", AgentInfo::new("activity-agent", "Activity ideas"));
        registry.register("planner", AgentInfo::new("ledger-agent", "Fact gathering"));

        let workers = registry.agents_with_role("worker");
        assert_eq!(workers.len(), 2);
        assert!(registry.agents_with_role("unknown").is_empty());
    }

    #[test]
    fn test_team_description_collapses_newlines() {
        let mut registry = InMemoryAgentRegistry::new();
        registry.register(
            "worker",
            AgentInfo::new("weather-agent", "Weather\nforecasts"),
        );
        registry.register("worker", AgentInfo::new("activity-agent", "Activity ideas"));

        let description = registry.team_description("worker");
        assert_eq!(
            description,
            "weather-agent: Weather forecasts\n\nactivity-agent: Activity ideas"
        );
    }
}
