//! Turn-loop orchestrator that drives one `AgentRun` from `pending` to a
//! terminal state, wiring together policy enforcement, budget tracking,
//! event recording and the acceptance gate (spec §4.8, component C8).

pub mod cancel;
pub mod kernel;

pub use cancel::CancelToken;
pub use kernel::HarnessKernel;
