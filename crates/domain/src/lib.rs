//! Core data model, error taxonomy, spec validator and materializer
//! contract for the harness — depended on by every other `ab-*` crate.
//!
//! AgentSpec — Immutable description of an intended agent execution.
//! AgentRun — A single attempt to execute a spec; has a status and is
//! finalized to a verdict.
//! AgentEvent — A single immutable audit record within a run.
//! Artifact — A content-addressed blob referenced by events or the run.

pub mod config;
pub mod error;
pub mod event;
pub mod materializer;
pub mod run;
pub mod spec;
pub mod turn_executor;
pub mod validate;

pub use error::{Error, Result};
pub use event::{
    AgentEvent, Artifact, ArtifactLocation, ArtifactType, EventType, ARTIFACT_INLINE_THRESHOLD,
    EVENT_PAYLOAD_MAX_SIZE,
};
pub use run::{AcceptanceResults, AgentRun, RunStatus, ValidatorResult, Verdict, ViolationAggregation};
pub use spec::{AcceptanceSpec, AgentSpec, GateMode, TaskType, ToolPolicy, ValidatorSpec};
pub use turn_executor::{ExecutionContext, ToolCallRequest, ToolCallResult, TurnExecutor, TurnResult, Usage};
pub use validate::{validate_spec, SpecValidationResult, ValidationError};
