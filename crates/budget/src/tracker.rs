use ab_domain::{AgentRun, Error, Result, Usage};
use chrono::{DateTime, Utc};

/// Turns + wall-clock budget checks (spec §4.5), bound to one spec's
/// limits. Stateless beyond those two numbers — the mutable counters live
/// on the `AgentRun` the kernel owns.
#[derive(Debug, Clone, Copy)]
pub struct BudgetTracker {
    max_turns: u32,
    timeout_seconds: u64,
}

impl BudgetTracker {
    pub fn new(max_turns: u32, timeout_seconds: u64) -> Self {
        Self { max_turns, timeout_seconds }
    }

    /// Raises `MaxTurnsExceeded` if `turns_used >= max_turns`. Called
    /// before dispatching the next turn, so `max_turns = 0` raises before
    /// any turn ever executes.
    pub fn check_turns_or_raise(&self, turns_used: u32) -> Result<()> {
        if turns_used >= self.max_turns {
            return Err(Error::MaxTurnsExceeded {
                turns_used,
                max_turns: self.max_turns,
            });
        }
        Ok(())
    }

    /// Raises `TimeoutSecondsExceeded` if the wall-clock elapsed since
    /// `started_at` is at or past the budget. `started_at` is `None` only
    /// before the run's first `running` transition, in which case no time
    /// has elapsed.
    pub fn check_timeout_or_raise(&self, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
        let Some(started_at) = started_at else {
            return Ok(());
        };
        let elapsed_seconds = (now - started_at).num_seconds().max(0) as u64;
        if elapsed_seconds >= self.timeout_seconds {
            return Err(Error::TimeoutSecondsExceeded {
                elapsed_seconds,
                timeout_seconds: self.timeout_seconds,
            });
        }
        Ok(())
    }

    /// Applies one completed turn's usage to the run's counters (spec
    /// §4.5: `turns_used += 1`, token counters accumulated). A missing
    /// `input_tokens`/`output_tokens` leaves that counter unchanged and
    /// logs a warning rather than guessing a value (DESIGN.md Open
    /// Question resolution).
    pub fn record_turn(&self, run: &mut AgentRun, usage: &Usage) {
        run.turns_used += 1;
        match usage.input_tokens {
            Some(tokens) => run.tokens_in += tokens,
            None => tracing::warn!(run_id = %run.id, "turn usage missing input_tokens; counter left unchanged"),
        }
        match usage.output_tokens {
            Some(tokens) => run.tokens_out += tokens,
            None => tracing::warn!(run_id = %run.id, "turn usage missing output_tokens; counter left unchanged"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn run() -> AgentRun {
        AgentRun::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn zero_max_turns_raises_before_any_turn() {
        let tracker = BudgetTracker::new(0, 60);
        let err = tracker.check_turns_or_raise(0).unwrap_err();
        assert!(matches!(err, Error::MaxTurnsExceeded { turns_used: 0, max_turns: 0 }));
    }

    #[test]
    fn turns_within_budget_pass() {
        let tracker = BudgetTracker::new(3, 60);
        assert!(tracker.check_turns_or_raise(0).is_ok());
        assert!(tracker.check_turns_or_raise(2).is_ok());
        assert!(tracker.check_turns_or_raise(3).is_err());
    }

    #[test]
    fn timeout_raises_once_elapsed_meets_budget() {
        let tracker = BudgetTracker::new(10, 60);
        let started = Utc::now() - Duration::seconds(61);
        let err = tracker.check_timeout_or_raise(Some(started), Utc::now()).unwrap_err();
        assert!(matches!(err, Error::TimeoutSecondsExceeded { .. }));
    }

    #[test]
    fn no_started_at_never_times_out() {
        let tracker = BudgetTracker::new(10, 60);
        assert!(tracker.check_timeout_or_raise(None, Utc::now()).is_ok());
    }

    #[test]
    fn record_turn_accumulates_counters_and_skips_missing_usage() {
        let tracker = BudgetTracker::new(5, 60);
        let mut r = run();
        tracker.record_turn(&mut r, &Usage { input_tokens: Some(10), output_tokens: Some(5) });
        tracker.record_turn(&mut r, &Usage { input_tokens: None, output_tokens: Some(3) });
        assert_eq!(r.turns_used, 2);
        assert_eq!(r.tokens_in, 10);
        assert_eq!(r.tokens_out, 8);
    }
}
