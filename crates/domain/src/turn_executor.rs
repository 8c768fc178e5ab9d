use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::run::AgentRun;
use crate::spec::AgentSpec;

/// A tool call the executor intends to make, before policy enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// The result of a tool call, whether it actually ran or was synthesized
/// by the policy enforcer for a blocked call (spec §4.4, §4.8 step 2c).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Token usage reported by the provider for one turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// One round of provider interaction (spec §6 "Turn Executor").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub done: bool,
    pub message: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_results: Vec<ToolCallResult>,
    pub usage: Usage,
}

/// Project directory and any request-scoped data the executor needs.
/// Deliberately opaque beyond the project root — the kernel never
/// interprets `extra`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub project_root: PathBuf,
    pub extra: serde_json::Value,
}

/// External collaborator the kernel drives (spec §1, §6). The concrete LLM
/// provider is deliberately out of scope — this is the only seam the
/// kernel depends on, generalized from the teacher's `LlmProvider` trait
/// shape (`providers/traits.rs`) down to the exact `(run, spec) ->
/// TurnResult` signature the spec calls for, rather than a streaming chat
/// abstraction.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn execute(
        &self,
        run: &AgentRun,
        spec: &AgentSpec,
        context: &ExecutionContext,
    ) -> Result<TurnResult, Error>;
}
