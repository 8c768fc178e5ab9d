/// DDL for the five tables the spec's persisted storage layout calls for
/// (spec §6), with the indexes required by §3: `(run_id, sequence)`
/// unique, `(run_id, event_type)`, `timestamp`, `tool_name`. Structured
/// the way the teacher's `agtrace-index::Database::init_schema` lays out
/// one `CREATE TABLE IF NOT EXISTS` per entity followed by its indexes in
/// a single `execute_batch` call.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS agent_specs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    task_type TEXT NOT NULL,
    json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS acceptance_specs (
    agent_spec_id TEXT PRIMARY KEY,
    gate_mode TEXT NOT NULL,
    json TEXT NOT NULL,
    FOREIGN KEY (agent_spec_id) REFERENCES agent_specs(id)
);

CREATE TABLE IF NOT EXISTS agent_runs (
    id TEXT PRIMARY KEY,
    agent_spec_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    json TEXT NOT NULL,
    FOREIGN KEY (agent_spec_id) REFERENCES agent_specs(id)
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON agent_runs(status);
CREATE INDEX IF NOT EXISTS idx_runs_spec ON agent_runs(agent_spec_id);

CREATE TABLE IF NOT EXISTS agent_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    tool_name TEXT,
    payload_truncated INTEGER,
    artifact_ref TEXT,
    json TEXT NOT NULL,
    FOREIGN KEY (run_id) REFERENCES agent_runs(id),
    UNIQUE (run_id, sequence)
);

CREATE INDEX IF NOT EXISTS idx_events_run_type ON agent_events(run_id, event_type);
CREATE INDEX IF NOT EXISTS idx_events_timestamp ON agent_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_tool ON agent_events(tool_name);

CREATE TABLE IF NOT EXISTS artifacts (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    artifact_type TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    content_inline BLOB,
    content_ref TEXT,
    metadata TEXT NOT NULL,
    FOREIGN KEY (run_id) REFERENCES agent_runs(id),
    UNIQUE (run_id, content_hash)
);
"#;
