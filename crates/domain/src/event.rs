use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounded inline payload size; beyond this an event overflows to an
/// Artifact (spec §3, §4.2).
pub const EVENT_PAYLOAD_MAX_SIZE: usize = 4096;

/// Default inline/file threshold for artifact storage (spec §4.3).
pub const ARTIFACT_INLINE_THRESHOLD: usize = 16 * 1024;

/// Enumerated event types (Glossary). Kept as a string-tagged enum so new
/// event types round-trip cleanly through storage without a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Started,
    ToolCall,
    ToolResult,
    TurnComplete,
    AcceptanceCheck,
    Completed,
    Failed,
    Timeout,
    Paused,
    Resumed,
    PolicyViolation,
    AgentPlanned,
    AgentMaterialized,
    IconGenerated,
    TestsWritten,
    TestsExecuted,
    TestResultArtifactCreated,
    OctoFailure,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Started => "started",
            EventType::ToolCall => "tool_call",
            EventType::ToolResult => "tool_result",
            EventType::TurnComplete => "turn_complete",
            EventType::AcceptanceCheck => "acceptance_check",
            EventType::Completed => "completed",
            EventType::Failed => "failed",
            EventType::Timeout => "timeout",
            EventType::Paused => "paused",
            EventType::Resumed => "resumed",
            EventType::PolicyViolation => "policy_violation",
            EventType::AgentPlanned => "agent_planned",
            EventType::AgentMaterialized => "agent_materialized",
            EventType::IconGenerated => "icon_generated",
            EventType::TestsWritten => "tests_written",
            EventType::TestsExecuted => "tests_executed",
            EventType::TestResultArtifactCreated => "test_result_artifact_created",
            EventType::OctoFailure => "octo_failure",
        }
    }
}

/// Immutable audit record (spec §3). `id` is a storage-assigned surrogate
/// key distinct from `sequence`, which is only monotonic within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: i64,
    pub run_id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub tool_name: Option<String>,
    pub payload: serde_json::Value,
    pub payload_truncated: Option<u64>,
    pub artifact_ref: Option<Uuid>,
}

/// Kind of content an Artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Log,
    TestResult,
    Icon,
}

impl ArtifactType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::Log => "log",
            ArtifactType::TestResult => "test_result",
            ArtifactType::Icon => "icon",
        }
    }
}

/// Where an artifact's bytes live: inline in the row, or on disk under
/// `<project>/.autobuildr/artifacts/<run_id>/<content_hash>.blob`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArtifactLocation {
    Inline(Vec<u8>),
    Ref(String),
}

/// Content-addressed blob (spec §3, §4.3). `(content_hash, run_id)` is
/// deduplicated at store time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub run_id: Uuid,
    pub artifact_type: ArtifactType,
    pub content_hash: String,
    pub size_bytes: u64,
    pub location: ArtifactLocation,
    pub artifact_metadata: serde_json::Value,
}
