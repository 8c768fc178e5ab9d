//! Layered configuration, one file per concern — the same shape as the
//! teacher's `domain/src/config/*` modules (each a `serde(default)` struct
//! plus free functions for numeric defaults).

mod budget;
mod observability;
mod policy;
mod retry;
mod storage;

pub use budget::BudgetConfig;
pub use observability::ObservabilityConfig;
pub use policy::PolicyConfig;
pub use retry::RetryConfig;
pub use storage::StorageConfig;

use serde::{Deserialize, Serialize};

/// Top-level config a host loads from TOML (mirrors the teacher's root
/// config struct composing one field per concern).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}
