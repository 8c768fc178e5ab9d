use serde::{Deserialize, Serialize};

/// Retry/backoff policy, read per-spec rather than process-wide (spec
/// §4.7: "Retry policy is read from the spec ... not process-wide"). Shape
/// mirrors the teacher's numeric-knob config structs
/// (`domain/config/quota.rs`) with one field per backoff parameter and a
/// serde-default helper per field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "d_base")]
    pub base: f64,
    #[serde(default = "d_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "d_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: d_max_retries(),
            initial_backoff_ms: d_initial_backoff_ms(),
            base: d_base(),
            max_backoff_ms: d_max_backoff_ms(),
            jitter: d_jitter(),
        }
    }
}

fn d_max_retries() -> u32 {
    3
}
fn d_initial_backoff_ms() -> u64 {
    500
}
fn d_base() -> f64 {
    2.0
}
fn d_max_backoff_ms() -> u64 {
    30_000
}
fn d_jitter() -> f64 {
    0.1
}
