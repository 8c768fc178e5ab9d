use std::path::Path;

use ab_domain::{
    AgentEvent, AgentRun, AgentSpec, Artifact, ArtifactLocation, ArtifactType, Error, EventType,
    Result, RunStatus,
};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::schema::SCHEMA_SQL;

#[allow(clippy::type_complexity)]
type ArtifactRow = (String, String, String, String, i64, Option<Vec<u8>>, Option<String>, String);

/// A handle on the relational store backing the harness (spec §6
/// "Persisted storage layout"). Wraps a single `rusqlite::Connection`
/// behind a `Mutex`, mirroring the teacher's single-`Connection` field on
/// `agtrace-index::Database` — generalized with a lock since this system's
/// runs are mutated by concurrently-running kernel tasks rather than one
/// CLI process at a time.
pub struct Database {
    conn: Mutex<Connection>,
    row_lock_timeout_ms: u64,
}

impl Database {
    /// Opens (creating if needed) the on-disk database at `db_path`,
    /// applying the row-lock busy timeout from `StorageConfig`.
    pub fn open(db_path: &Path, row_lock_timeout_ms: u64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(|e| Error::Sqlite(e.to_string()))?;
        let db = Self {
            conn: Mutex::new(conn),
            row_lock_timeout_ms,
        };
        db.init(row_lock_timeout_ms)?;
        Ok(db)
    }

    /// In-memory database for tests (mirrors
    /// `agtrace-index::Database::open_in_memory`).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Sqlite(e.to_string()))?;
        let db = Self {
            conn: Mutex::new(conn),
            row_lock_timeout_ms: 5_000,
        };
        db.init(5_000)?;
        Ok(db)
    }

    fn init(&self, row_lock_timeout_ms: u64) -> Result<()> {
        let conn = self.conn.lock();
        conn.busy_timeout(std::time::Duration::from_millis(row_lock_timeout_ms))
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(())
    }

    // ── agent_specs ─────────────────────────────────────────────────

    pub fn insert_spec(&self, spec: &AgentSpec) -> Result<()> {
        let conn = self.conn.lock();
        let json = serde_json::to_string(spec)?;
        conn.execute(
            "INSERT INTO agent_specs (id, name, task_type, json) VALUES (?1, ?2, ?3, ?4)",
            params![
                spec.id.to_string(),
                spec.name,
                serde_json::to_value(spec.task_type)?.as_str().unwrap_or("custom"),
                json
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(())
    }

    pub fn get_spec(&self, id: Uuid) -> Result<Option<AgentSpec>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT json FROM agent_specs WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        json.map(|j| serde_json::from_str(&j).map_err(Error::from)).transpose()
    }

    pub fn find_spec_by_name(&self, name: &str) -> Result<Option<AgentSpec>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row("SELECT json FROM agent_specs WHERE name = ?1", [name], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        json.map(|j| serde_json::from_str(&j).map_err(Error::from)).transpose()
    }

    // ── agent_runs ──────────────────────────────────────────────────

    pub fn insert_run(&self, run: &AgentRun) -> Result<()> {
        let conn = self.conn.lock();
        let json = serde_json::to_string(run)?;
        conn.execute(
            "INSERT INTO agent_runs (id, agent_spec_id, status, started_at, completed_at, json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.id.to_string(),
                run.agent_spec_id.to_string(),
                run.status.as_str(),
                run.started_at.map(|t| t.to_rfc3339()),
                run.completed_at.map(|t| t.to_rfc3339()),
                json
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(())
    }

    /// Persists a run's full state under a `BEGIN IMMEDIATE` transaction,
    /// the SQLite stand-in for the row lock the spec calls for
    /// (`SELECT ... FOR UPDATE`, spec §4.8) — there is no direct SQLite
    /// equivalent, so an immediate-mode write transaction is used instead
    /// (see DESIGN.md). A busy connection past `row_lock_timeout_ms`
    /// surfaces as `Error::DatabaseLock`.
    pub fn update_run(&self, run: &AgentRun) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(|e| classify_busy(e, self.row_lock_timeout_ms))?;
        let json = serde_json::to_string(run)?;
        tx.execute(
            "UPDATE agent_runs SET status = ?2, started_at = ?3, completed_at = ?4, json = ?5
             WHERE id = ?1",
            params![
                run.id.to_string(),
                run.status.as_str(),
                run.started_at.map(|t| t.to_rfc3339()),
                run.completed_at.map(|t| t.to_rfc3339()),
                json
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        tx.commit().map_err(|e| classify_busy(e, self.row_lock_timeout_ms))?;
        Ok(())
    }

    pub fn get_run(&self, id: Uuid) -> Result<Option<AgentRun>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row("SELECT json FROM agent_runs WHERE id = ?1", [id.to_string()], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        json.map(|j| serde_json::from_str(&j).map_err(Error::from)).transpose()
    }

    /// All runs currently in one of `statuses` — used by orphan recovery
    /// (spec §4.12) to scan `{running, pending}` at startup.
    pub fn list_runs_by_status(&self, statuses: &[RunStatus]) -> Result<Vec<AgentRun>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT json FROM agent_runs")
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| Error::Sqlite(e.to_string()))?;
            let run: AgentRun = serde_json::from_str(&json)?;
            if statuses.contains(&run.status) {
                out.push(run);
            }
        }
        Ok(out)
    }

    // ── agent_events ────────────────────────────────────────────────

    /// Highest sequence used so far for `run_id`, via a descending query
    /// (spec §4.2 step 1: "in-memory cache primed from a descending query
    /// on first use").
    pub fn max_sequence(&self, run_id: Uuid) -> Result<u64> {
        let conn = self.conn.lock();
        let seq: Option<i64> = conn
            .query_row(
                "SELECT sequence FROM agent_events WHERE run_id = ?1 ORDER BY sequence DESC LIMIT 1",
                [run_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(seq.unwrap_or(0) as u64)
    }

    /// Inserts one event. The `(run_id, sequence)` unique constraint is
    /// the sole arbiter of ordering under races — a conflict surfaces as
    /// `Error::IntegrityRace` so the caller re-primes its sequence cache
    /// and retries with a fresh number (spec §4.2 "on retry the cache is
    /// re-primed from storage").
    /// `event.id` is ignored on the way in (it is storage-assigned) and
    /// the row's `json` column is written with the real autoincrement id
    /// filled in, so every later read sees a consistent surrogate key.
    pub fn insert_event(&self, event: &AgentEvent) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_events
                (run_id, sequence, timestamp, event_type, tool_name, payload_truncated, artifact_ref, json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.run_id.to_string(),
                event.sequence as i64,
                event.timestamp.to_rfc3339(),
                serde_json::to_value(event.event_type)?.as_str().unwrap_or("").to_string(),
                event.tool_name,
                event.payload_truncated.map(|v| v as i64),
                event.artifact_ref.map(|id| id.to_string()),
                serde_json::to_string(event)?,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
                Error::IntegrityRace(format!("sequence {} already used for run {}", event.sequence, event.run_id))
            }
            other => Error::Sqlite(other.to_string()),
        })?;
        let id = conn.last_insert_rowid();
        let mut stamped = event.clone();
        stamped.id = id;
        conn.execute(
            "UPDATE agent_events SET json = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(&stamped)?],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(id)
    }

    pub fn list_events(&self, run_id: Uuid) -> Result<Vec<AgentEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT json FROM agent_events WHERE run_id = ?1 ORDER BY sequence ASC")
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let rows = stmt
            .query_map([run_id.to_string()], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| Error::Sqlite(e.to_string()))?;
            out.push(serde_json::from_str(&json)?);
        }
        Ok(out)
    }

    // ── artifacts ───────────────────────────────────────────────────

    pub fn find_artifact_by_hash(&self, run_id: Uuid, content_hash: &str) -> Result<Option<Artifact>> {
        let conn = self.conn.lock();
        let row: Option<ArtifactRow> = conn
            .query_row(
                "SELECT id, run_id, artifact_type, content_hash, size_bytes, content_inline, content_ref, metadata
                 FROM artifacts WHERE run_id = ?1 AND content_hash = ?2",
                params![run_id.to_string(), content_hash],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        row.map(artifact_from_row).transpose()
    }

    pub fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>> {
        let conn = self.conn.lock();
        let row: Option<ArtifactRow> = conn
            .query_row(
                "SELECT id, run_id, artifact_type, content_hash, size_bytes, content_inline, content_ref, metadata
                 FROM artifacts WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        row.map(artifact_from_row).transpose()
    }

    /// Inserts an artifact; a conflict on `(run_id, content_hash)` is
    /// treated as a no-op dedup hit rather than an error (spec §3
    /// "`(content_hash, run_id)` pair is stored at most once").
    pub fn insert_artifact(&self, run_id: Uuid, artifact: &Artifact) -> Result<()> {
        let conn = self.conn.lock();
        let (inline, ref_path) = match &artifact.location {
            ArtifactLocation::Inline(bytes) => (Some(bytes.clone()), None),
            ArtifactLocation::Ref(path) => (None, Some(path.clone())),
        };
        conn.execute(
            "INSERT INTO artifacts (id, run_id, artifact_type, content_hash, size_bytes, content_inline, content_ref, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(run_id, content_hash) DO NOTHING",
            params![
                artifact.id.to_string(),
                run_id.to_string(),
                artifact.artifact_type.as_str(),
                artifact.content_hash,
                artifact.size_bytes as i64,
                inline,
                ref_path,
                serde_json::to_string(&artifact.artifact_metadata)?
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(())
    }
}

fn artifact_from_row(row: ArtifactRow) -> Result<Artifact> {
    let (id, run_id, artifact_type, content_hash, size_bytes, inline, content_ref, metadata) = row;
    let location = match (inline, content_ref) {
        (Some(bytes), _) => ArtifactLocation::Inline(bytes),
        (None, Some(path)) => ArtifactLocation::Ref(path),
        (None, None) => ArtifactLocation::Inline(Vec::new()),
    };
    Ok(Artifact {
        id: Uuid::parse_str(&id).map_err(|e| Error::Other(e.to_string()))?,
        run_id: Uuid::parse_str(&run_id).map_err(|e| Error::Other(e.to_string()))?,
        artifact_type: match artifact_type.as_str() {
            "log" => ArtifactType::Log,
            "test_result" => ArtifactType::TestResult,
            "icon" => ArtifactType::Icon,
            other => return Err(Error::Other(format!("unknown artifact_type `{other}`"))),
        },
        content_hash,
        size_bytes: size_bytes as u64,
        location,
        artifact_metadata: serde_json::from_str(&metadata)?,
    })
}

fn classify_busy(err: rusqlite::Error, timeout_ms: u64) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
            Error::DatabaseLock(format!("row lock not acquired within {timeout_ms}ms"))
        }
        _ => Error::Sqlite(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::{AcceptanceSpec, GateMode, TaskType, ToolPolicy};
    use chrono::Utc;

    fn spec() -> AgentSpec {
        AgentSpec {
            id: Uuid::new_v4(),
            name: "feature-1-test".into(),
            display_name: "Test".into(),
            objective: "do the thing".into(),
            task_type: TaskType::Coding,
            tool_policy: ToolPolicy::default(),
            max_turns: 5,
            timeout_seconds: 60,
            acceptance_spec: AcceptanceSpec::default(),
            context: serde_json::Value::Null,
            tags: vec![],
            priority: 0,
            source_feature_id: None,
        }
    }

    #[test]
    fn insert_and_get_spec_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let s = spec();
        db.insert_spec(&s).unwrap();
        let fetched = db.get_spec(s.id).unwrap().unwrap();
        assert_eq!(fetched.name, s.name);
    }

    #[test]
    fn insert_and_update_run() {
        let db = Database::open_in_memory().unwrap();
        let s = spec();
        db.insert_spec(&s).unwrap();
        let mut run = AgentRun::new(Uuid::new_v4(), s.id);
        db.insert_run(&run).unwrap();
        run.transition(RunStatus::Running, None, Utc::now()).unwrap();
        db.update_run(&run).unwrap();
        let fetched = db.get_run(run.id).unwrap().unwrap();
        assert_eq!(fetched.status, RunStatus::Running);
    }

    #[test]
    fn list_runs_by_status_filters() {
        let db = Database::open_in_memory().unwrap();
        let s = spec();
        db.insert_spec(&s).unwrap();
        let mut r1 = AgentRun::new(Uuid::new_v4(), s.id);
        r1.transition(RunStatus::Running, None, Utc::now()).unwrap();
        db.insert_run(&r1).unwrap();
        let r2 = AgentRun::new(Uuid::new_v4(), s.id);
        db.insert_run(&r2).unwrap();

        let running = db.list_runs_by_status(&[RunStatus::Running]).unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, r1.id);

        let pending = db.list_runs_by_status(&[RunStatus::Pending]).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, r2.id);
    }

    #[test]
    fn events_ordered_by_sequence_and_sequence_conflict_is_integrity_race() {
        let db = Database::open_in_memory().unwrap();
        let s = spec();
        db.insert_spec(&s).unwrap();
        let run = AgentRun::new(Uuid::new_v4(), s.id);
        db.insert_run(&run).unwrap();

        let ev = |seq: u64| AgentEvent {
            id: 0,
            run_id: run.id,
            sequence: seq,
            timestamp: Utc::now(),
            event_type: EventType::Started,
            tool_name: None,
            payload: serde_json::json!({}),
            payload_truncated: None,
            artifact_ref: None,
        };
        db.insert_event(&ev(1)).unwrap();
        db.insert_event(&ev(2)).unwrap();
        let err = db.insert_event(&ev(2)).unwrap_err();
        assert!(matches!(err, Error::IntegrityRace(_)));

        let events = db.list_events(run.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
    }

    #[test]
    fn artifact_dedup_on_run_and_hash() {
        let db = Database::open_in_memory().unwrap();
        let s = spec();
        db.insert_spec(&s).unwrap();
        let run = AgentRun::new(Uuid::new_v4(), s.id);
        db.insert_run(&run).unwrap();

        let artifact = Artifact {
            id: Uuid::new_v4(),
            run_id: run.id,
            artifact_type: ArtifactType::Log,
            content_hash: "deadbeef".into(),
            size_bytes: 3,
            location: ArtifactLocation::Inline(b"abc".to_vec()),
            artifact_metadata: serde_json::json!({}),
        };
        db.insert_artifact(run.id, &artifact).unwrap();
        // Second store of identical content is a no-op, not an error.
        let artifact2 = Artifact { id: Uuid::new_v4(), ..artifact.clone() };
        db.insert_artifact(run.id, &artifact2).unwrap();

        let found = db.find_artifact_by_hash(run.id, "deadbeef").unwrap().unwrap();
        assert_eq!(found.id, artifact.id);
    }
}
