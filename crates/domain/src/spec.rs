use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of work an agent run is meant to accomplish. Drives the
/// default tool policy and budget shape in spec derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Coding,
    Testing,
    Refactoring,
    Documentation,
    Audit,
    Custom,
}

/// Tool allow/deny policy embedded in a spec (spec §6 "Tool-policy input
/// shape"). Compiled once per spec at load time by `ab-policy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPolicy {
    #[serde(default = "default_policy_version")]
    pub version: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub forbidden_tools: Vec<String>,
    #[serde(default)]
    pub forbidden_patterns: Vec<String>,
    #[serde(default)]
    pub allowed_directories: Vec<String>,
    #[serde(default)]
    pub tool_hints: HashMap<String, String>,
}

fn default_policy_version() -> String {
    "v1".to_string()
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            version: default_policy_version(),
            allowed_tools: Vec::new(),
            forbidden_tools: Vec::new(),
            forbidden_patterns: Vec::new(),
            allowed_directories: Vec::new(),
            tool_hints: HashMap::new(),
        }
    }
}

/// Combination rule across acceptance validators (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    AllPass,
    AnyPass,
    Weighted,
}

/// A single pluggable acceptance validator declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSpec {
    #[serde(rename = "type")]
    pub validator_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// Ordered list of validators plus the combination rule (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceSpec {
    pub validators: Vec<ValidatorSpec>,
    pub gate_mode: GateMode,
}

impl Default for AcceptanceSpec {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
            gate_mode: GateMode::AllPass,
        }
    }
}

/// Opaque context carried through a spec: originating feature id, model
/// hint, source type. Deliberately untyped — callers populate whatever
/// their planner emitted.
pub type SpecContext = serde_json::Value;

/// Immutable description of an intended agent execution (spec §3). Built
/// once by a derivation or planner, validated once, and referenced
/// read-only by every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub objective: String,
    pub task_type: TaskType,
    pub tool_policy: ToolPolicy,
    pub max_turns: u32,
    pub timeout_seconds: u64,
    pub acceptance_spec: AcceptanceSpec,
    #[serde(default)]
    pub context: SpecContext,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub source_feature_id: Option<String>,
}
