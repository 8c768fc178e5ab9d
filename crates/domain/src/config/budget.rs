use serde::{Deserialize, Serialize};

use crate::validate::{MAX_MAX_TURNS, MAX_TIMEOUT_SECONDS, MIN_MAX_TURNS, MIN_TIMEOUT_SECONDS};

/// Bounds the spec validator clamps `max_turns`/`timeout_seconds` against
/// (spec §4.10). Defaults mirror the hard bounds declared alongside the
/// validator; a host config can narrow them further but never widen past
/// the hard-coded `MIN_*`/`MAX_*` constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "d_min_max_turns")]
    pub min_max_turns: u32,
    #[serde(default = "d_max_max_turns")]
    pub max_max_turns: u32,
    #[serde(default = "d_min_timeout")]
    pub min_timeout_seconds: u64,
    #[serde(default = "d_max_timeout")]
    pub max_timeout_seconds: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            min_max_turns: MIN_MAX_TURNS,
            max_max_turns: MAX_MAX_TURNS,
            min_timeout_seconds: MIN_TIMEOUT_SECONDS,
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
        }
    }
}

fn d_min_max_turns() -> u32 {
    MIN_MAX_TURNS
}
fn d_max_max_turns() -> u32 {
    MAX_MAX_TURNS
}
fn d_min_timeout() -> u64 {
    MIN_TIMEOUT_SECONDS
}
fn d_max_timeout() -> u64 {
    MAX_TIMEOUT_SECONDS
}
