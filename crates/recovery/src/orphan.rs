use ab_domain::{AgentRun, RunStatus};
use ab_events::EventRecorder;
use ab_storage::Database;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary emitted by one orphan-recovery sweep (spec §4.12).
#[derive(Debug, Clone, Serialize)]
pub struct OrphanSummary {
    pub total_found: u64,
    pub cleaned_count: u64,
    pub skipped_count: u64,
    pub errors: Vec<String>,
    pub cleanup_timestamp: DateTime<Utc>,
}

/// Scans every run in `{running, pending}` and reconciles the stale ones
/// to `failed`, at most once per process startup. Runs exactly once per
/// call; calling it again when nothing is stale yields `cleaned_count =
/// 0` (spec §8 idempotence property).
pub fn reconcile(storage: &Database, recorder: &EventRecorder, default_timeout_seconds: u64, now: DateTime<Utc>) -> OrphanSummary {
    let candidates = match storage.list_runs_by_status(&[RunStatus::Running, RunStatus::Pending]) {
        Ok(runs) => runs,
        Err(e) => {
            return OrphanSummary {
                total_found: 0,
                cleaned_count: 0,
                skipped_count: 0,
                errors: vec![format!("failed to scan for orphaned runs: {e}")],
                cleanup_timestamp: now,
            };
        }
    };

    let total_found = candidates.len() as u64;
    let mut cleaned_count = 0;
    let mut skipped_count = 0;
    let mut errors = Vec::new();

    for mut run in candidates {
        let timeout_seconds = match storage.get_spec(run.agent_spec_id) {
            Ok(Some(spec)) => spec.timeout_seconds,
            Ok(None) => {
                tracing::warn!(run_id = %run.id, "orphan scan: spec missing, using default timeout");
                default_timeout_seconds
            }
            Err(e) => {
                errors.push(format!("run {}: failed to load spec: {e}", run.id));
                skipped_count += 1;
                continue;
            }
        };

        if !is_stale(&run, timeout_seconds, now) {
            skipped_count += 1;
            continue;
        }

        if let Err(e) = run.transition(RunStatus::Failed, Some("orphaned_on_restart".to_string()), now) {
            errors.push(format!("run {}: {e}", run.id));
            continue;
        }
        if let Err(e) = storage.update_run(&run) {
            errors.push(format!("run {}: failed to persist reconciled state: {e}", run.id));
            continue;
        }
        if let Err(e) = recorder.record_failed(run.id, "orphaned_on_restart") {
            errors.push(format!("run {}: failed to record failed event: {e}", run.id));
        }
        cleaned_count += 1;
    }

    OrphanSummary {
        total_found,
        cleaned_count,
        skipped_count,
        errors,
        cleanup_timestamp: now,
    }
}

/// `pending` with no `started_at` is always stale; otherwise stale when
/// `now - started_at > timeout_seconds` (spec §4.12). Both `pending`
/// variants are treated as stale by default (DESIGN.md Open Question
/// resolution).
fn is_stale(run: &AgentRun, timeout_seconds: u64, now: DateTime<Utc>) -> bool {
    match run.started_at {
        Some(started_at) => {
            let elapsed = (now - started_at).num_seconds();
            elapsed > timeout_seconds as i64
        }
        None => run.status == RunStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::{AcceptanceSpec, AgentSpec, GateMode, TaskType, ToolPolicy};
    use ab_events::ArtifactStore;
    use chrono::Duration;
    use std::sync::Arc;
    use uuid::Uuid;

    fn harness() -> (tempfile::TempDir, Arc<Database>, EventRecorder) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Database::open_in_memory().unwrap());
        let artifacts = Arc::new(ArtifactStore::new(storage.clone(), dir.path().to_path_buf(), 16 * 1024));
        let recorder = EventRecorder::new(storage.clone(), artifacts);
        (dir, storage, recorder)
    }

    fn seed_spec(storage: &Database, timeout_seconds: u64) -> Uuid {
        let spec = AgentSpec {
            id: Uuid::new_v4(),
            name: format!("feature-{}-x", Uuid::new_v4()),
            display_name: "X".into(),
            objective: "x".into(),
            task_type: TaskType::Coding,
            tool_policy: ToolPolicy::default(),
            max_turns: 5,
            timeout_seconds,
            acceptance_spec: AcceptanceSpec { validators: vec![], gate_mode: GateMode::AllPass },
            context: serde_json::Value::Null,
            tags: vec![],
            priority: 0,
            source_feature_id: None,
        };
        storage.insert_spec(&spec).unwrap();
        spec.id
    }

    #[test]
    fn reconciles_stale_running_and_pending_runs() {
        let (_dir, db, recorder) = harness();
        let spec_id = seed_spec(&db, 300);
        let now = Utc::now();

        let mut r1 = AgentRun::new(Uuid::new_v4(), spec_id);
        r1.transition(RunStatus::Running, None, now - Duration::hours(2)).unwrap();
        db.insert_run(&r1).unwrap();

        let r2 = AgentRun::new(Uuid::new_v4(), spec_id);
        db.insert_run(&r2).unwrap();

        let summary = reconcile(&db, &recorder, 300, now);
        assert_eq!(summary.total_found, 2);
        assert_eq!(summary.cleaned_count, 2);
        assert!(summary.errors.is_empty());

        assert_eq!(db.get_run(r1.id).unwrap().unwrap().status, RunStatus::Failed);
        assert_eq!(db.get_run(r2.id).unwrap().unwrap().status, RunStatus::Failed);
    }

    #[test]
    fn recently_started_run_is_skipped() {
        let (_dir, db, recorder) = harness();
        let spec_id = seed_spec(&db, 300);
        let now = Utc::now();

        let mut r = AgentRun::new(Uuid::new_v4(), spec_id);
        r.transition(RunStatus::Running, None, now - Duration::seconds(5)).unwrap();
        db.insert_run(&r).unwrap();

        let summary = reconcile(&db, &recorder, 300, now);
        assert_eq!(summary.cleaned_count, 0);
        assert_eq!(summary.skipped_count, 1);
        assert_eq!(db.get_run(r.id).unwrap().unwrap().status, RunStatus::Running);
    }

    #[test]
    fn second_sweep_is_idempotent() {
        let (_dir, db, recorder) = harness();
        let spec_id = seed_spec(&db, 300);
        let now = Utc::now();

        let mut r = AgentRun::new(Uuid::new_v4(), spec_id);
        r.transition(RunStatus::Running, None, now - Duration::hours(2)).unwrap();
        db.insert_run(&r).unwrap();

        let first = reconcile(&db, &recorder, 300, now);
        assert_eq!(first.cleaned_count, 1);

        let second = reconcile(&db, &recorder, 300, now);
        assert_eq!(second.total_found, 0);
        assert_eq!(second.cleaned_count, 0);
    }
}
