use std::collections::HashMap;
use std::sync::Arc;

use ab_domain::{AgentEvent, ArtifactType, Error, EventType, Result, EVENT_PAYLOAD_MAX_SIZE};
use ab_storage::Database;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::artifact::ArtifactStore;

/// Sequential, durable audit log (spec §4.2). One recorder is shared by
/// every kernel instance in the process; the in-memory sequence cache is
/// keyed per run and re-primed from storage whenever an insert races
/// another writer.
pub struct EventRecorder {
    storage: Arc<Database>,
    artifacts: Arc<ArtifactStore>,
    sequences: Mutex<HashMap<Uuid, u64>>,
}

impl EventRecorder {
    pub fn new(storage: Arc<Database>, artifacts: Arc<ArtifactStore>) -> Self {
        Self {
            storage,
            artifacts,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    /// Appends one event for `run_id`, overflowing the payload to an
    /// artifact when it exceeds `EVENT_PAYLOAD_MAX_SIZE`. Returns the
    /// storage-assigned event id.
    pub fn record(
        &self,
        run_id: Uuid,
        event_type: EventType,
        payload: Value,
        tool_name: Option<String>,
    ) -> Result<i64> {
        let serialized = serde_json::to_vec(&payload)?;
        let (stored_payload, payload_truncated, artifact_ref) = if serialized.len() <= EVENT_PAYLOAD_MAX_SIZE {
            (payload, None, None)
        } else {
            let summary = truncate_summary(&payload);
            let artifact = self
                .artifacts
                .store(run_id, ArtifactType::Log, &serialized, json!({ "event_type": event_type.as_str() }))?;
            (summary, Some(serialized.len() as u64), Some(artifact.id))
        };

        loop {
            let sequence = self.next_sequence(run_id)?;
            let event = AgentEvent {
                id: 0,
                run_id,
                sequence,
                timestamp: Utc::now(),
                event_type,
                tool_name: tool_name.clone(),
                payload: stored_payload.clone(),
                payload_truncated,
                artifact_ref,
            };
            match self.storage.insert_event(&event) {
                Ok(id) => {
                    tracing::debug!(%run_id, sequence, event_type = event_type.as_str(), "recorded event");
                    return Ok(id);
                }
                Err(Error::IntegrityRace(_)) => {
                    // Another writer took this sequence number first; drop
                    // our cached allocation and re-prime from storage.
                    self.sequences.lock().remove(&run_id);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn next_sequence(&self, run_id: Uuid) -> Result<u64> {
        let mut cache = self.sequences.lock();
        let last = match cache.get(&run_id) {
            Some(seq) => *seq,
            None => self.storage.max_sequence(run_id)?,
        };
        let next = last + 1;
        cache.insert(run_id, next);
        Ok(next)
    }

    // ── convenience wrappers (spec §4.2 "thin shells with a documented shape") ──

    pub fn record_started(&self, run_id: Uuid, agent_spec_id: Uuid, objective: &str) -> Result<i64> {
        self.record(
            run_id,
            EventType::Started,
            json!({ "agent_spec_id": agent_spec_id, "objective": objective }),
            None,
        )
    }

    pub fn record_tool_call(&self, run_id: Uuid, turn_number: u32, tool_name: &str, arguments: &Value) -> Result<i64> {
        self.record(
            run_id,
            EventType::ToolCall,
            json!({ "turn_number": turn_number, "arguments": arguments }),
            Some(tool_name.to_string()),
        )
    }

    pub fn record_tool_result(
        &self,
        run_id: Uuid,
        turn_number: u32,
        tool_name: &str,
        success: bool,
        result: &Value,
    ) -> Result<i64> {
        self.record(
            run_id,
            EventType::ToolResult,
            json!({ "turn_number": turn_number, "success": success, "result": result }),
            Some(tool_name.to_string()),
        )
    }

    pub fn record_turn_complete(&self, run_id: Uuid, turn_number: u32, tokens_in: u64, tokens_out: u64) -> Result<i64> {
        self.record(
            run_id,
            EventType::TurnComplete,
            json!({ "turn_number": turn_number, "tokens_in": tokens_in, "tokens_out": tokens_out }),
            None,
        )
    }

    pub fn record_policy_violation(
        &self,
        run_id: Uuid,
        turn_number: u32,
        violation_type: &str,
        tool_name: &str,
        detail: &str,
        matched_or_attempted: Option<&str>,
        arguments: &Value,
    ) -> Result<i64> {
        self.record(
            run_id,
            EventType::PolicyViolation,
            json!({
                "turn_number": turn_number,
                "violation_type": violation_type,
                "detail": detail,
                "matched_or_attempted": matched_or_attempted,
                "arguments": arguments,
            }),
            Some(tool_name.to_string()),
        )
    }

    pub fn record_acceptance_check(&self, run_id: Uuid, final_verdict: &str, partial: bool) -> Result<i64> {
        self.record(
            run_id,
            EventType::AcceptanceCheck,
            json!({ "final_verdict": final_verdict, "partial": partial }),
            None,
        )
    }

    pub fn record_completed(&self, run_id: Uuid, turns_used: u32, tokens_in: u64, tokens_out: u64) -> Result<i64> {
        self.record(
            run_id,
            EventType::Completed,
            json!({ "turns_used": turns_used, "tokens_in": tokens_in, "tokens_out": tokens_out }),
            None,
        )
    }

    pub fn record_failed(&self, run_id: Uuid, error: &str) -> Result<i64> {
        self.record(run_id, EventType::Failed, json!({ "error": error }), None)
    }

    pub fn record_timeout(
        &self,
        run_id: Uuid,
        reason: &str,
        turns_used: u32,
        max_turns: u32,
        elapsed_seconds: u64,
        timeout_seconds: u64,
    ) -> Result<i64> {
        self.record(
            run_id,
            EventType::Timeout,
            json!({
                "reason": reason,
                "turns_used": turns_used,
                "max_turns": max_turns,
                "elapsed_seconds": elapsed_seconds,
                "timeout_seconds": timeout_seconds,
            }),
            None,
        )
    }
}

/// Builds a bounded summary that preserves top-level keys while shortening
/// each value, used for the payload stored alongside an overflowed event
/// (spec §4.2 step 2a).
fn truncate_summary(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), shorten(value));
            }
            Value::Object(out)
        }
        other => shorten(other),
    }
}

const SUMMARY_STRING_LIMIT: usize = 200;

fn shorten(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > SUMMARY_STRING_LIMIT => {
            let head: String = s.chars().take(SUMMARY_STRING_LIMIT).collect();
            Value::String(format!("{head}…"))
        }
        Value::Array(items) if items.len() > 10 => Value::String(format!("[{} items]", items.len())),
        Value::Object(_) => Value::String("{…}".to_string()),
        other => other.clone(),
    }
}
