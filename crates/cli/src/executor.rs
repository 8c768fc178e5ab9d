use ab_domain::{AgentRun, AgentSpec, ExecutionContext, Result, TurnExecutor, TurnResult, Usage};
use async_trait::async_trait;

/// A `TurnExecutor` that completes a run on its first turn without
/// producing any tool calls. Concrete LLM provider integration is out of
/// scope for this harness (spec §1) — the CLI's `run` subcommand needs
/// some executor to hand the kernel, and this one exists so the full
/// persistence/policy/event/acceptance pipeline can be exercised end to
/// end from the command line without a model in the loop. A host embedding
/// `ab-kernel` directly supplies its own `TurnExecutor`.
pub struct NoopExecutor;

#[async_trait]
impl TurnExecutor for NoopExecutor {
    async fn execute(&self, _run: &AgentRun, _spec: &AgentSpec, _ctx: &ExecutionContext) -> Result<TurnResult> {
        Ok(TurnResult {
            done: true,
            message: "noop executor: no turn-execution backend configured".to_string(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            usage: Usage { input_tokens: Some(0), output_tokens: Some(0) },
        })
    }
}
