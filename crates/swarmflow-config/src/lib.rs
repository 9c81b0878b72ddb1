//! # Swarmflow Config
//!
//! Single-file configuration management for Swarmflow. One `swarmflow.yaml`
//! configures engine defaults, orchestrator thresholds, and store selection.

mod loader;

pub use loader::{load_config, ConfigError};

use serde::Deserialize;

fn default_version() -> u32 {
    1
}

/// Top-level configuration schema for Swarmflow.
#[derive(Debug, Clone, Deserialize)]
pub struct SwarmflowConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub sequential: SequentialConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

impl Default for SwarmflowConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            engine: EngineConfig::default(),
            adaptive: AdaptiveConfig::default(),
            sequential: SequentialConfig::default(),
            stores: StoresConfig::default(),
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

fn default_app_name() -> String {
    "swarmflow".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

/// Engine-level step execution defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Per-step deadline in seconds. Long, because steps wrap LLM calls.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Retries after the initial attempt.
    #[serde(default = "default_step_retries")]
    pub step_retries: u32,
}

fn default_step_timeout_secs() -> u64 {
    60
}

fn default_step_retries() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            step_retries: default_step_retries(),
        }
    }
}

/// Adaptive loop thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptiveConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,
    #[serde(default = "default_max_replans")]
    pub max_replans: u32,
    /// Role queried for the single-agent shortcut and team descriptions.
    #[serde(default = "default_worker_role")]
    pub worker_role: String,
}

fn default_max_turns() -> u32 {
    15
}

fn default_stall_threshold() -> u32 {
    3
}

fn default_max_replans() -> u32 {
    2
}

fn default_worker_role() -> String {
    "worker".to_string()
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            stall_threshold: default_stall_threshold(),
            max_replans: default_max_replans(),
            worker_role: default_worker_role(),
        }
    }
}

/// Sequential plan limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SequentialConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    50
}

impl Default for SequentialConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

/// Instance store selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Base directory for the file store.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}
