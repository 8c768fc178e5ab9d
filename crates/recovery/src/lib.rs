//! Error recovery: retry classification and orphan-run reconciliation
//! (spec components C7/C12).

mod classify;
mod orphan;

pub use classify::{next_retry, RetryOutcome};
pub use orphan::{reconcile, OrphanSummary};
