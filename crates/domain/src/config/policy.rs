use serde::{Deserialize, Serialize};

/// Controls how strictly the Tool Policy Enforcer compiles a spec's
/// `forbidden_patterns` at load time (spec §4.4): in strict mode a bad
/// pattern aborts the load; otherwise it is skipped with a logged warning.
/// Mirrors the teacher's `ExecSecurityConfig` (`domain/config/tools.rs`)
/// generalized from the single `exec` tool to every tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "d_strict")]
    pub strict_pattern_compilation: bool,
    /// Parameter names the directory-sandbox check scans for a candidate
    /// file-operation target (spec §4.4 step 4).
    #[serde(default = "d_path_param_names")]
    pub path_param_names: Vec<String>,
    /// Maximum symlink resolution chain length before treating the path as
    /// unresolvable (spec §4.4 step 4 "fixed limit").
    #[serde(default = "d_symlink_limit")]
    pub max_symlink_resolution: u8,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_pattern_compilation: d_strict(),
            path_param_names: d_path_param_names(),
            max_symlink_resolution: d_symlink_limit(),
        }
    }
}

fn d_strict() -> bool {
    true
}

fn d_path_param_names() -> Vec<String> {
    vec![
        "path".to_string(),
        "file_path".to_string(),
        "target".to_string(),
        "destination".to_string(),
    ]
}

fn d_symlink_limit() -> u8 {
    8
}
