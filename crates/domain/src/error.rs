use thiserror::Error;

/// Error taxonomy for the harness. Every kind in the kernel's error-handling
/// design maps to exactly one variant here; retry policy inspects `kind()`,
/// never the concrete variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error("spec validation failed: {0}")]
    SpecValidation(String),

    #[error("invalid state transition for run {run_id}: {from} -> {to}")]
    InvalidStateTransition {
        run_id: uuid::Uuid,
        from: String,
        to: String,
    },

    #[error("policy violation: {violation_type} on tool {tool_name}: {detail}")]
    PolicyViolation {
        violation_type: String,
        tool_name: String,
        detail: String,
    },

    #[error("max turns exceeded: {turns_used}/{max_turns}")]
    MaxTurnsExceeded { turns_used: u32, max_turns: u32 },

    #[error("timeout exceeded: {elapsed_seconds}/{timeout_seconds}s")]
    TimeoutSecondsExceeded {
        elapsed_seconds: u64,
        timeout_seconds: u64,
    },

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("transient server error: {0}")]
    TransientServer(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("tool execution error: {0}")]
    ToolExecutionError(String),

    #[error("database lock timeout: {0}")]
    DatabaseLock(String),

    #[error("integrity race: {0}")]
    IntegrityRace(String),

    #[error("run orphaned on restart: {0}")]
    OrphanedOnRestart(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Sqlite(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A stable, lowercase discriminant matching the Glossary's event/error
    /// naming (used as the `error` string recorded on terminal transitions
    /// and as the retry-classification key).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SpecValidation(_) => "spec_validation",
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::PolicyViolation { .. } => "policy_violation",
            Error::MaxTurnsExceeded { .. } => "max_turns_exceeded",
            Error::TimeoutSecondsExceeded { .. } => "timeout_exceeded",
            Error::RateLimit(_) => "rate_limit",
            Error::Connection(_) => "connection",
            Error::TransientServer(_) => "transient_server",
            Error::Authentication(_) => "authentication",
            Error::BadRequest(_) => "bad_request",
            Error::ToolExecutionError(_) => "tool_execution_error",
            Error::DatabaseLock(_) => "database_lock",
            Error::IntegrityRace(_) => "integrity_race",
            Error::OrphanedOnRestart(_) => "orphaned_on_restart",
            Error::Cancelled(_) => "cancelled",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Sqlite(_) => "sqlite",
            Error::Other(_) => "other",
        }
    }

    /// Retryable transport errors get backoff-and-retry (§4.7); everything
    /// else either aborts the run immediately or is handled inline (tool
    /// errors, policy violations) rather than retried at this layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimit(_) | Error::Connection(_) | Error::TransientServer(_)
        )
    }
}
