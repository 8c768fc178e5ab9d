//! Shared test fixtures used only under `dev-dependencies`: an in-memory
//! storage+artifact harness and a scripted `TurnExecutor` test double,
//! grounded on the teacher's `LlmProvider` trait seam (`providers/traits.rs`)
//! generalized to a turn-indexed canned-response fixture, in the same
//! spirit as the inline `#[cfg(test)]` fixtures the teacher scatters
//! through `runs.rs`/`quota.rs`/`config/agents.rs`.

use std::sync::Arc;

use ab_domain::{
    AgentRun, AgentSpec, Error, ExecutionContext, Result, ToolCallRequest, ToolCallResult,
    TurnExecutor, TurnResult, Usage,
};
use ab_events::ArtifactStore;
use ab_storage::Database;
use async_trait::async_trait;
use parking_lot::Mutex;

/// One scripted turn: what the fixture should hand back when the kernel
/// invokes the executor for the Nth time, or an error to simulate a
/// classified provider failure.
pub enum ScriptedTurn {
    Turn(TurnResult),
    Fail(Error),
}

impl ScriptedTurn {
    pub fn done(message: impl Into<String>, tokens_in: u64, tokens_out: u64) -> Self {
        ScriptedTurn::Turn(TurnResult {
            done: true,
            message: message.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            usage: Usage {
                input_tokens: Some(tokens_in),
                output_tokens: Some(tokens_out),
            },
        })
    }

    pub fn continuing(message: impl Into<String>, tokens_in: u64, tokens_out: u64) -> Self {
        ScriptedTurn::Turn(TurnResult {
            done: false,
            message: message.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            usage: Usage {
                input_tokens: Some(tokens_in),
                output_tokens: Some(tokens_out),
            },
        })
    }

    pub fn with_tool_call(
        done: bool,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        success: bool,
        result: Option<serde_json::Value>,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Self {
        let tool_name = tool_name.into();
        ScriptedTurn::Turn(TurnResult {
            done,
            message: String::new(),
            tool_calls: vec![ToolCallRequest {
                tool_name: tool_name.clone(),
                arguments,
            }],
            tool_results: vec![ToolCallResult {
                tool_name,
                success,
                result,
                error: None,
            }],
            usage: Usage {
                input_tokens: Some(tokens_in),
                output_tokens: Some(tokens_out),
            },
        })
    }
}

/// A `TurnExecutor` that plays back a fixed script, one entry per call to
/// `execute`. Panics (via an assertion error inside the `Result`) if the
/// kernel calls it more times than the script has entries, which usually
/// means a budget check failed to short-circuit the loop as expected.
pub struct ScriptedExecutor {
    script: Mutex<std::collections::VecDeque<ScriptedTurn>>,
    calls: Mutex<u32>,
}

impl ScriptedExecutor {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            script: Mutex::new(turns.into()),
            calls: Mutex::new(0),
        }
    }

    /// An executor that never signals `done` — used to exercise budget
    /// exhaustion (spec §8 scenario 2).
    pub fn never_done(tokens_in: u64, tokens_out: u64) -> RepeatingExecutor {
        RepeatingExecutor { tokens_in, tokens_out }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl TurnExecutor for ScriptedExecutor {
    async fn execute(&self, _run: &AgentRun, _spec: &AgentSpec, _ctx: &ExecutionContext) -> Result<TurnResult> {
        *self.calls.lock() += 1;
        let next = self.script.lock().pop_front();
        match next {
            Some(ScriptedTurn::Turn(result)) => Ok(result),
            Some(ScriptedTurn::Fail(err)) => Err(err),
            None => Err(Error::Other("ScriptedExecutor: script exhausted".to_string())),
        }
    }
}

/// Executor that always reports `done = false` — pairs with a low
/// `max_turns`/`timeout_seconds` spec to deterministically exercise
/// budget-exhaustion paths.
pub struct RepeatingExecutor {
    tokens_in: u64,
    tokens_out: u64,
}

#[async_trait]
impl TurnExecutor for RepeatingExecutor {
    async fn execute(&self, _run: &AgentRun, _spec: &AgentSpec, _ctx: &ExecutionContext) -> Result<TurnResult> {
        Ok(TurnResult {
            done: false,
            message: "still working".to_string(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            usage: Usage {
                input_tokens: Some(self.tokens_in),
                output_tokens: Some(self.tokens_out),
            },
        })
    }
}

/// A fresh in-memory storage + artifact-store + event-recorder stack, for
/// kernel-level integration tests. Holds the `TempDir` alive so the
/// artifact directory outlives the test.
pub struct TestHarness {
    pub storage: Arc<Database>,
    pub artifacts: Arc<ArtifactStore>,
    pub recorder: Arc<ab_events::EventRecorder>,
    _artifacts_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(Database::open_in_memory().expect("in-memory db"));
        let artifacts = Arc::new(ArtifactStore::new(storage.clone(), dir.path().to_path_buf(), 16 * 1024));
        let recorder = Arc::new(ab_events::EventRecorder::new(storage.clone(), artifacts.clone()));
        Self {
            storage,
            artifacts,
            recorder,
            _artifacts_dir: dir,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimal valid spec builder for tests, overridable field-by-field.
pub fn sample_spec(max_turns: u32, timeout_seconds: u64) -> AgentSpec {
    use ab_domain::{AcceptanceSpec, GateMode, TaskType, ToolPolicy, ValidatorSpec};
    AgentSpec {
        id: uuid::Uuid::new_v4(),
        name: format!("feature-{}-sample", uuid::Uuid::new_v4()),
        display_name: "Sample".to_string(),
        objective: "Do the sample thing.".to_string(),
        task_type: TaskType::Coding,
        tool_policy: ToolPolicy::default(),
        max_turns,
        timeout_seconds,
        acceptance_spec: AcceptanceSpec {
            validators: vec![ValidatorSpec {
                validator_type: "file_exists".to_string(),
                config: serde_json::json!({ "path": "out.txt", "should_exist": false }),
                required: true,
                weight: 1.0,
            }],
            gate_mode: GateMode::AllPass,
        },
        context: serde_json::Value::Null,
        tags: vec![],
        priority: 0,
        source_feature_id: None,
    }
}
