use ab_domain::{AgentEvent, AgentRun, EventType, Result};
use ab_storage::Database;
use serde_json::Value;
use uuid::Uuid;

use crate::artifact::ArtifactStore;

/// One replayed event with its payload fully resolved — for events that
/// overflowed to an artifact, `full_payload` is the artifact's decoded
/// content rather than the truncated summary stored on the row.
pub struct ReplayedEvent {
    pub event: AgentEvent,
    pub full_payload: Value,
}

/// Reconstructed event sequence for one run (spec §4.11).
pub struct ReplayResult {
    pub events: Vec<ReplayedEvent>,
    pub is_valid: bool,
}

/// Debug context for a failed (or any) run: the last tool call/result seen
/// and the terminal error, if any (spec §4.11).
#[derive(Debug, Clone)]
pub struct DebugContext {
    pub run_status: ab_domain::RunStatus,
    pub failure_reason: Option<String>,
    pub last_tool_call: Option<Value>,
    pub last_tool_result: Option<Value>,
    pub turns_used: u32,
    pub tokens_used: u64,
}

/// Reconstructs the event sequence for `run_id` in ascending order,
/// resolving truncated payloads via their referenced artifact.
pub fn replay(storage: &Database, artifacts: &ArtifactStore, run_id: Uuid) -> Result<ReplayResult> {
    let events = storage.list_events(run_id)?;
    let is_valid = sequence_is_contiguous(&events);

    let mut out = Vec::with_capacity(events.len());
    for event in events {
        let full_payload = match (event.payload_truncated, event.artifact_ref) {
            (Some(_), Some(artifact_id)) => {
                let artifact = storage.get_artifact(artifact_id)?.ok_or_else(|| {
                    ab_domain::Error::Other(format!(
                        "event {} references missing artifact {artifact_id}",
                        event.id
                    ))
                })?;
                let bytes = artifacts.retrieve(&artifact)?;
                serde_json::from_slice(&bytes)?
            }
            _ => event.payload.clone(),
        };
        out.push(ReplayedEvent { event, full_payload });
    }

    Ok(ReplayResult { events: out, is_valid })
}

/// `is_valid` per spec §4.11: sequences are exactly `1..N` with no gaps.
fn sequence_is_contiguous(events: &[AgentEvent]) -> bool {
    events.iter().enumerate().all(|(idx, event)| event.sequence == idx as u64 + 1)
}

/// Builds the debug context exposed for a run (typically one that failed),
/// scanning its events in reverse for the most recent tool call/result.
pub fn debug_context(run: &AgentRun, events: &[AgentEvent]) -> DebugContext {
    let mut last_tool_call = None;
    let mut last_tool_result = None;
    for event in events.iter().rev() {
        if last_tool_call.is_none() && event.event_type == EventType::ToolCall {
            last_tool_call = Some(event.payload.clone());
        }
        if last_tool_result.is_none() && event.event_type == EventType::ToolResult {
            last_tool_result = Some(event.payload.clone());
        }
        if last_tool_call.is_some() && last_tool_result.is_some() {
            break;
        }
    }
    DebugContext {
        run_status: run.status,
        failure_reason: run.error.clone(),
        last_tool_call,
        last_tool_result,
        turns_used: run.turns_used,
        tokens_used: run.tokens_in + run.tokens_out,
    }
}
