//! Tool Policy Enforcer (spec §4.4): compiled allow/deny checks run before
//! every tool invocation, generalized from the teacher's
//! `domain/config/agents.rs::ToolPolicy::allows` (allow/deny prefix
//! matching) and `tools/file_ops.rs::validate_path` (single-root
//! traversal/containment check) to the full gating pipeline: allowed
//! tools, forbidden tools, forbidden argument patterns, and a
//! multi-directory sandbox with URL-encoded-traversal and symlink-chain
//! handling.

mod aggregation;
mod enforcer;
mod sandbox;

pub use aggregation::record_violation;
pub use enforcer::{CompiledPolicy, PolicyViolation};
pub use sandbox::{check_sandbox, detect_raw_traversal, Resolved, SandboxViolation};
