use std::sync::Arc;

use ab_acceptance::{run_gate, FeatureStatusProvider, ValidatorContext};
use ab_budget::BudgetTracker;
use ab_domain::config::{PolicyConfig, RetryConfig};
use ab_domain::{AgentRun, AgentSpec, ExecutionContext, Result, RunStatus, TurnExecutor};
use ab_events::EventRecorder;
use ab_policy::{record_violation, CompiledPolicy};
use ab_recovery::{next_retry, RetryOutcome};
use ab_storage::Database;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

/// Agent-agnostic turn-loop orchestrator (spec §4.8, component C8). Owns
/// no state of its own beyond its collaborators — every run's mutable
/// state lives on the `AgentRun` row, read and written through
/// `ab-storage`, matching the teacher's pattern of a stateless orchestrator
/// (`runtime/turn.rs::run_turn`) driving a persisted `Run` record
/// (`runtime/runs.rs`).
pub struct HarnessKernel {
    storage: Arc<Database>,
    recorder: Arc<EventRecorder>,
    default_retry: RetryConfig,
    policy_config: PolicyConfig,
}

/// Detail carried on a `timeout` event (spec §4.8 "Budget-exhaustion
/// handling").
struct TimeoutDetail {
    reason: &'static str,
    turns_used: u32,
    max_turns: u32,
    elapsed_seconds: u64,
    timeout_seconds: u64,
}

/// Why the per-turn loop stopped.
enum LoopExit {
    Done,
    Timeout(TimeoutDetail),
    Cancelled,
    Failed(String),
}

impl HarnessKernel {
    pub fn new(
        storage: Arc<Database>,
        recorder: Arc<EventRecorder>,
        default_retry: RetryConfig,
        policy_config: PolicyConfig,
    ) -> Self {
        Self {
            storage,
            recorder,
            default_retry,
            policy_config,
        }
    }

    /// Drives one run to a terminal state (spec §4.8). `run_id` may name a
    /// run the caller already inserted as `pending`, or a fresh id the
    /// kernel creates on first use ("reconcile IDs"). Never returns an
    /// error for anything that happened *during* execution — every
    /// reachable failure mode is caught and turned into a terminal
    /// `AgentRun` (spec §7 "Propagation policy"). The only errors this can
    /// return are storage failures encountered while trying to persist the
    /// terminal state itself, which the caller cannot recover from either.
    pub async fn run(
        &self,
        spec: &AgentSpec,
        run_id: Uuid,
        executor: Arc<dyn TurnExecutor>,
        exec_ctx: &ExecutionContext,
        feature_status: Option<&dyn FeatureStatusProvider>,
        cancel: &crate::cancel::CancelToken,
    ) -> Result<AgentRun> {
        let mut run = match self.storage.get_run(run_id)? {
            Some(r) => r,
            None => {
                let r = AgentRun::new(run_id, spec.id);
                self.storage.insert_run(&r)?;
                r
            }
        };

        run.transition(RunStatus::Running, None, Utc::now())?;
        self.storage.update_run(&run)?;
        self.recorder.record_started(run.id, spec.id, &spec.objective)?;

        let budget = BudgetTracker::new(spec.max_turns, spec.timeout_seconds);
        let retry_cfg = self.retry_config_for(spec);

        let policy = match CompiledPolicy::compile(&spec.tool_policy, &self.policy_config) {
            Ok(p) => p,
            Err(e) => {
                self.finalize(
                    &mut run,
                    spec,
                    exec_ctx,
                    feature_status,
                    RunStatus::Failed,
                    Some(e.to_string()),
                    true,
                    None,
                )?;
                return Ok(run);
            }
        };

        let mut turn_number: u32 = 0;
        let exit = loop {
            if cancel.is_cancelled() {
                break LoopExit::Cancelled;
            }
            if budget.check_turns_or_raise(run.turns_used).is_err() {
                break LoopExit::Timeout(self.timeout_detail("max_turns_exceeded", &run, spec));
            }
            let now = Utc::now();
            if budget.check_timeout_or_raise(run.started_at, now).is_err() {
                break LoopExit::Timeout(self.timeout_detail("timeout_exceeded", &run, spec));
            }

            turn_number += 1;
            let span = tracing::info_span!("turn", run_id = %run.id, turn_number);
            let _entered = span.enter();

            let turn_result = match self
                .execute_with_retry(executor.as_ref(), &mut run, spec, exec_ctx, &retry_cfg)
                .await
            {
                Ok(result) => result,
                Err(e) => break LoopExit::Failed(e.to_string()),
            };
            drop(_entered);

            if let Err(e) = self.apply_turn(&mut run, &policy, turn_number, &turn_result) {
                break LoopExit::Failed(e.to_string());
            }

            budget.record_turn(&mut run, &turn_result.usage);
            if let Err(e) = self.storage.update_run(&run) {
                break LoopExit::Failed(e.to_string());
            }

            if turn_result.done {
                break LoopExit::Done;
            }
        };

        match exit {
            LoopExit::Done => {
                self.finalize(
                    &mut run,
                    spec,
                    exec_ctx,
                    feature_status,
                    RunStatus::Completed,
                    None,
                    false,
                    None,
                )?;
            }
            LoopExit::Timeout(detail) => {
                let reason = detail.reason.to_string();
                self.finalize(
                    &mut run,
                    spec,
                    exec_ctx,
                    feature_status,
                    RunStatus::Timeout,
                    Some(reason),
                    true,
                    Some(detail),
                )?;
            }
            LoopExit::Cancelled => {
                self.finalize(
                    &mut run,
                    spec,
                    exec_ctx,
                    feature_status,
                    RunStatus::Failed,
                    Some("cancelled".to_string()),
                    true,
                    None,
                )?;
            }
            LoopExit::Failed(message) => {
                self.finalize(
                    &mut run,
                    spec,
                    exec_ctx,
                    feature_status,
                    RunStatus::Failed,
                    Some(message),
                    true,
                    None,
                )?;
            }
        }

        Ok(run)
    }

    /// Retry policy is read per spec, not process-wide (spec §4.7). The
    /// data model keeps `AgentSpec` free of a dedicated retry field
    /// (DESIGN.md Open Question resolution), so an override is read from
    /// `spec.context.retry` when present and falls back to the kernel's
    /// configured default otherwise.
    fn retry_config_for(&self, spec: &AgentSpec) -> RetryConfig {
        spec.context
            .get("retry")
            .and_then(|v| serde_json::from_value::<RetryConfig>(v.clone()).ok())
            .unwrap_or(self.default_retry)
    }

    fn timeout_detail(&self, reason: &'static str, run: &AgentRun, spec: &AgentSpec) -> TimeoutDetail {
        let elapsed_seconds = run
            .started_at
            .map(|started| (Utc::now() - started).num_seconds().max(0) as u64)
            .unwrap_or(0);
        TimeoutDetail {
            reason,
            turns_used: run.turns_used,
            max_turns: spec.max_turns,
            elapsed_seconds,
            timeout_seconds: spec.timeout_seconds,
        }
    }

    /// Invokes the turn executor, retrying classified transient errors
    /// with backoff per §4.7. Returns the final error (non-retryable or
    /// exhausted) if the executor never succeeds.
    async fn execute_with_retry(
        &self,
        executor: &dyn TurnExecutor,
        run: &mut AgentRun,
        spec: &AgentSpec,
        exec_ctx: &ExecutionContext,
        retry_cfg: &RetryConfig,
    ) -> Result<ab_domain::TurnResult> {
        let mut attempt = 0u32;
        loop {
            match executor.execute(run, spec, exec_ctx).await {
                Ok(result) => return Ok(result),
                Err(e) => match next_retry(retry_cfg, &e, attempt, None) {
                    RetryOutcome::NonRetryable | RetryOutcome::Exhausted => return Err(e),
                    RetryOutcome::Retry { attempt: next_attempt, delay } => {
                        run.retry_count += 1;
                        tracing::info!(
                            run_id = %run.id,
                            attempt = next_attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying turn after classified provider error"
                        );
                        tokio::time::sleep(delay).await;
                        attempt = next_attempt;
                    }
                },
            }
        }
    }

    /// Routes every intended tool call through the policy enforcer,
    /// recording `tool_call`/`tool_result`/`policy_violation` events as it
    /// goes (spec §4.8 step 2c/2d, §4.4 "blocked call is recorded").
    /// Blocked calls never reach the executor's own reported result — the
    /// kernel always records a synthetic `success=false` outcome for them.
    fn apply_turn(
        &self,
        run: &mut AgentRun,
        policy: &CompiledPolicy,
        turn_number: u32,
        turn_result: &ab_domain::TurnResult,
    ) -> Result<()> {
        for (idx, call) in turn_result.tool_calls.iter().enumerate() {
            match policy.check(&call.tool_name, &call.arguments) {
                Ok(()) => {
                    self.recorder
                        .record_tool_call(run.id, turn_number, &call.tool_name, &call.arguments)?;
                    let reported = turn_result.tool_results.get(idx);
                    let (success, result) = match reported {
                        Some(r) => (r.success, r.result.clone().unwrap_or(serde_json::Value::Null)),
                        None => (true, serde_json::Value::Null),
                    };
                    self.recorder
                        .record_tool_result(run.id, turn_number, &call.tool_name, success, &result)?;
                }
                Err(violation) => {
                    record_violation(&mut run.acceptance_results.violation_aggregation, &violation, turn_number);
                    self.recorder.record_policy_violation(
                        run.id,
                        turn_number,
                        violation.violation_type,
                        &call.tool_name,
                        &violation.detail,
                        violation.matched_pattern.as_deref().or(violation.attempted_path.as_deref()),
                        &call.arguments,
                    )?;
                    self.recorder.record_tool_result(
                        run.id,
                        turn_number,
                        &call.tool_name,
                        false,
                        &json!({ "error": violation.message() }),
                    )?;
                }
            }
        }
        self.recorder.record_turn_complete(
            run.id,
            turn_number,
            turn_result.usage.input_tokens.unwrap_or(0),
            turn_result.usage.output_tokens.unwrap_or(0),
        )?;
        Ok(())
    }

    /// Runs the acceptance gate, transitions the run to its terminal
    /// status, persists, and records the matching terminal event — the
    /// one code path every exit from the turn loop funnels through (spec
    /// §4.8 step 3-4, §4.6 "the gate runs even on timeout/budget
    /// exhaustion").
    #[allow(clippy::too_many_arguments)]
    fn finalize(
        &self,
        run: &mut AgentRun,
        spec: &AgentSpec,
        exec_ctx: &ExecutionContext,
        feature_status: Option<&dyn FeatureStatusProvider>,
        status: RunStatus,
        error: Option<String>,
        partial: bool,
        timeout_detail: Option<TimeoutDetail>,
    ) -> Result<()> {
        let ctx = ValidatorContext {
            project_root: &exec_ctx.project_root,
            feature_status,
        };
        let results = run_gate(
            &spec.acceptance_spec,
            &ctx,
            run.acceptance_results.violation_aggregation.clone(),
            partial,
        );
        run.acceptance_results = results;

        run.transition(status, error.clone(), Utc::now())?;
        self.storage.update_run(run)?;

        let verdict_str = run
            .acceptance_results
            .final_verdict
            .and_then(|v| serde_json::to_value(v).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "error".to_string());
        self.recorder.record_acceptance_check(run.id, &verdict_str, partial)?;

        match status {
            RunStatus::Completed => {
                self.recorder.record_completed(run.id, run.turns_used, run.tokens_in, run.tokens_out)?;
            }
            RunStatus::Failed => {
                self.recorder.record_failed(run.id, error.as_deref().unwrap_or("unknown"))?;
            }
            RunStatus::Timeout => {
                let detail = timeout_detail.expect("timeout finalize always carries TimeoutDetail");
                self.recorder.record_timeout(
                    run.id,
                    detail.reason,
                    detail.turns_used,
                    detail.max_turns,
                    detail.elapsed_seconds,
                    detail.timeout_seconds,
                )?;
            }
            _ => {}
        }
        Ok(())
    }
}
