use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Run lifecycle status (spec §3, §4.1). `Completed`, `Failed` and
/// `Timeout` are terminal — no further transition is ever permitted out of
/// them, mirroring the teacher's `RunStatus::is_terminal()` on
/// `gateway/runtime/runs.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Timeout,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Timeout => "timeout",
        }
    }
}

/// Returns whether `from -> to` is a permitted transition per the explicit
/// adjacency map in spec §4.1, extended with `pending -> failed` for
/// orphan recovery (spec §4.12 scenario 5: a `pending` run with no
/// `started_at` is reconciled straight to `failed` at startup without ever
/// entering `running`). This is the single source of truth — the kernel
/// must never mutate `AgentRun::status` without passing through
/// `transition`.
fn is_permitted(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    matches!(
        (from, to),
        (Pending, Running)
            | (Pending, Failed)
            | (Running, Paused)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Timeout)
            | (Paused, Running)
            | (Paused, Failed)
    )
}

/// Composite outcome of the acceptance gate (Glossary: Verdict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    Error,
}

/// Per-validator outcome, keyed by validator name in `AgentRun::acceptance_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorResult {
    pub name: String,
    pub status: Verdict,
    pub detail: String,
}

/// Aggregated policy-violation counters (spec §4.4), updated incrementally
/// by the kernel on every blocked tool call and independently derivable
/// from events alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationAggregation {
    pub total_count: u64,
    pub by_type: HashMap<String, u64>,
    pub by_tool: HashMap<String, u64>,
    pub last_turn: Option<u32>,
}

/// Run-scoped acceptance state: per-validator results, the composite
/// verdict, and the violation aggregation, all persisted as one JSON blob
/// on the run row (DESIGN.md: folds `violation_aggregation` into
/// `acceptance_results` rather than a separate table).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptanceResults {
    pub validator_results: Vec<ValidatorResult>,
    pub final_verdict: Option<Verdict>,
    pub violation_aggregation: ViolationAggregation,
    /// Set when the gate ran against an unfinished run (budget exhaustion
    /// or cancellation) rather than a clean `done` signal.
    pub partial: bool,
}

/// One execution instance of one spec (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: Uuid,
    pub agent_spec_id: Uuid,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub turns_used: u32,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub retry_count: u32,
    pub error: Option<String>,
    pub acceptance_results: AcceptanceResults,
}

impl AgentRun {
    pub fn new(id: Uuid, agent_spec_id: Uuid) -> Self {
        Self {
            id,
            agent_spec_id,
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            turns_used: 0,
            tokens_in: 0,
            tokens_out: 0,
            retry_count: 0,
            error: None,
            acceptance_results: AcceptanceResults::default(),
        }
    }

    /// `final_verdict` is a read-through on the acceptance results — it is
    /// not a distinct stored field, avoiding the two-sources-of-truth trap
    /// the spec's design notes call out for `turns_used`.
    pub fn final_verdict(&self) -> Option<Verdict> {
        self.acceptance_results.final_verdict
    }

    /// Apply a state transition, enforcing the adjacency map and the
    /// associated field-stamping rules (spec §4.1). `error` is required
    /// (and stamped) when transitioning to `Failed` or `Timeout`; it must
    /// be absent for `Completed`.
    pub fn transition(&mut self, to: RunStatus, error: Option<String>, now: DateTime<Utc>) -> Result<(), Error> {
        if !is_permitted(self.status, to) {
            return Err(Error::InvalidStateTransition {
                run_id: self.id,
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        if to == RunStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
        match to {
            RunStatus::Failed | RunStatus::Timeout => {
                self.error = error;
            }
            RunStatus::Completed => {
                self.error = None;
            }
            _ => {}
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> AgentRun {
        AgentRun::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn pending_to_running_stamps_started_at() {
        let mut r = run();
        let now = Utc::now();
        r.transition(RunStatus::Running, None, now).unwrap();
        assert_eq!(r.status, RunStatus::Running);
        assert_eq!(r.started_at, Some(now));
        assert!(r.completed_at.is_none());
    }

    #[test]
    fn running_to_completed_clears_error_and_stamps_completed_at() {
        let mut r = run();
        let t0 = Utc::now();
        r.transition(RunStatus::Running, None, t0).unwrap();
        let t1 = Utc::now();
        r.transition(RunStatus::Completed, None, t1).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.completed_at, Some(t1));
        assert!(r.error.is_none());
    }

    #[test]
    fn running_to_failed_sets_error() {
        let mut r = run();
        r.transition(RunStatus::Running, None, Utc::now()).unwrap();
        r.transition(RunStatus::Failed, Some("boom".into()), Utc::now())
            .unwrap();
        assert_eq!(r.status, RunStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_states_reject_any_further_transition() {
        for terminal in [RunStatus::Completed, RunStatus::Failed, RunStatus::Timeout] {
            let mut r = run();
            r.status = terminal;
            for target in [
                RunStatus::Pending,
                RunStatus::Running,
                RunStatus::Paused,
                RunStatus::Completed,
                RunStatus::Failed,
                RunStatus::Timeout,
            ] {
                let res = r.transition(target, None, Utc::now());
                assert!(res.is_err(), "{terminal:?} -> {target:?} should be rejected");
            }
        }
    }

    #[test]
    fn invalid_transition_pending_to_completed_rejected() {
        let mut r = run();
        assert!(r.transition(RunStatus::Completed, None, Utc::now()).is_err());
    }

    #[test]
    fn pending_to_failed_is_permitted_for_orphan_recovery() {
        let mut r = run();
        r.transition(RunStatus::Failed, Some("orphaned_on_restart".into()), Utc::now())
            .unwrap();
        assert_eq!(r.status, RunStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("orphaned_on_restart"));
        assert!(r.started_at.is_none());
    }

    #[test]
    fn paused_can_resume_or_be_cancelled() {
        let mut r = run();
        r.transition(RunStatus::Running, None, Utc::now()).unwrap();
        r.transition(RunStatus::Paused, None, Utc::now()).unwrap();
        assert!(r.transition(RunStatus::Completed, None, Utc::now()).is_err());
        r.transition(RunStatus::Running, None, Utc::now()).unwrap();
        assert_eq!(r.status, RunStatus::Running);
    }
}
