use std::path::PathBuf;

use ab_domain::config::PolicyConfig;
use ab_domain::{Error, ToolPolicy};
use regex::Regex;

use crate::sandbox::{check_sandbox, SandboxViolation};

/// A compiled `forbidden_patterns` entry: the original source string (for
/// reporting a verbatim match) plus its case-insensitive compiled form.
struct CompiledPattern {
    source: String,
    regex: Regex,
}

/// One blocked call (spec §4.4). Never causes the run to crash — the
/// kernel records this as a `policy_violation` event and returns a
/// synthetic failed tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub violation_type: &'static str,
    pub tool_name: String,
    pub detail: String,
    pub matched_pattern: Option<String>,
    pub attempted_path: Option<String>,
    pub resolved_path: Option<String>,
    pub is_symlink: Option<bool>,
}

impl PolicyViolation {
    pub fn message(&self) -> String {
        format!("{}: {}", self.violation_type, self.detail)
    }
}

/// A spec's tool policy, compiled once at load (spec §4.4). Holds the
/// precompiled forbidden-pattern regexes and the canonicalized
/// allowed-directory list so per-call enforcement never recompiles
/// anything.
pub struct CompiledPolicy {
    allowed_tools: Vec<String>,
    forbidden_tools: Vec<String>,
    forbidden_patterns: Vec<CompiledPattern>,
    allowed_directories: Vec<PathBuf>,
    path_param_names: Vec<String>,
    max_symlink_resolution: u8,
}

impl CompiledPolicy {
    /// Compiles a spec's `ToolPolicy`. In strict mode (the default) a bad
    /// forbidden-pattern regex aborts compilation; otherwise the pattern
    /// is skipped and a warning logged, matching spec §4.4.
    pub fn compile(policy: &ToolPolicy, config: &PolicyConfig) -> Result<Self, Error> {
        let mut forbidden_patterns = Vec::with_capacity(policy.forbidden_patterns.len());
        for source in &policy.forbidden_patterns {
            let compiled = Regex::new(&format!("(?i){source}"));
            match compiled {
                Ok(regex) => forbidden_patterns.push(CompiledPattern {
                    source: source.clone(),
                    regex,
                }),
                Err(e) => {
                    if config.strict_pattern_compilation {
                        return Err(Error::SpecValidation(format!(
                            "invalid forbidden_patterns entry `{source}`: {e}"
                        )));
                    }
                    tracing::warn!(pattern = %source, error = %e, "skipping invalid forbidden_patterns entry");
                }
            }
        }

        let allowed_directories = policy
            .allowed_directories
            .iter()
            .map(|d| {
                let abs = if PathBuf::from(d).is_absolute() {
                    PathBuf::from(d)
                } else {
                    std::env::current_dir().unwrap_or_default().join(d)
                };
                abs.canonicalize().unwrap_or(abs)
            })
            .collect();

        Ok(Self {
            allowed_tools: policy.allowed_tools.clone(),
            forbidden_tools: policy.forbidden_tools.clone(),
            forbidden_patterns,
            allowed_directories,
            path_param_names: config.path_param_names.clone(),
            max_symlink_resolution: config.max_symlink_resolution,
        })
    }

    /// Runs the full gating pipeline (spec §4.4 steps 1-4) for one tool
    /// call, stopping at the first failure. `arguments` must already be
    /// the canonical-JSON form the caller will also use to build the
    /// `policy_violation` event payload.
    pub fn check(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), PolicyViolation> {
        self.check_allowed_tools(tool_name)?;
        self.check_forbidden_tools(tool_name)?;
        self.check_forbidden_patterns(tool_name, arguments)?;
        self.check_directory_sandbox(tool_name, arguments)?;
        Ok(())
    }

    fn check_allowed_tools(&self, tool_name: &str) -> Result<(), PolicyViolation> {
        if self.allowed_tools.is_empty() {
            return Ok(());
        }
        if self.allowed_tools.iter().any(|t| t == tool_name) {
            Ok(())
        } else {
            Err(PolicyViolation {
                violation_type: "allowed_tools",
                tool_name: tool_name.to_string(),
                detail: format!("tool `{tool_name}` is not in allowed_tools"),
                matched_pattern: None,
                attempted_path: None,
                resolved_path: None,
                is_symlink: None,
            })
        }
    }

    fn check_forbidden_tools(&self, tool_name: &str) -> Result<(), PolicyViolation> {
        if self.forbidden_tools.iter().any(|t| t == tool_name) {
            Err(PolicyViolation {
                violation_type: "forbidden_tools",
                tool_name: tool_name.to_string(),
                detail: format!("tool `{tool_name}` is explicitly forbidden"),
                matched_pattern: None,
                attempted_path: None,
                resolved_path: None,
                is_symlink: None,
            })
        } else {
            Ok(())
        }
    }

    fn check_forbidden_patterns(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), PolicyViolation> {
        let canonical = canonical_json(arguments);
        for pattern in &self.forbidden_patterns {
            if pattern.regex.is_match(&canonical) {
                return Err(PolicyViolation {
                    violation_type: "forbidden_patterns",
                    tool_name: tool_name.to_string(),
                    detail: format!("arguments matched forbidden pattern `{}`", pattern.source),
                    matched_pattern: Some(pattern.source.clone()),
                    attempted_path: None,
                    resolved_path: None,
                    is_symlink: None,
                });
            }
        }
        Ok(())
    }

    fn check_directory_sandbox(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), PolicyViolation> {
        let serde_json::Value::Object(map) = arguments else {
            return Ok(());
        };
        let requested = self
            .path_param_names
            .iter()
            .find_map(|name| map.get(name).and_then(|v| v.as_str()));
        let Some(requested) = requested else {
            // Not a file-operation tool call — step 4 only applies when a
            // known path parameter is present.
            return Ok(());
        };

        match check_sandbox(&self.allowed_directories, requested, self.max_symlink_resolution) {
            Ok(_resolved) => Ok(()),
            Err(violation) => Err(sandbox_violation_to_policy(tool_name, requested, violation)),
        }
    }
}

fn sandbox_violation_to_policy(tool_name: &str, requested: &str, violation: SandboxViolation) -> PolicyViolation {
    let (detail, resolved_path, is_symlink) = match &violation {
        SandboxViolation::PathTraversal { reason } => (reason.clone(), None, None),
        SandboxViolation::BrokenSymlink => ("symlink target does not exist".to_string(), None, Some(true)),
        SandboxViolation::SymlinkChainTooLong => {
            ("symlink resolution chain exceeded the configured limit".to_string(), None, Some(true))
        }
        SandboxViolation::OutsideAllowedDirectories => (
            "resolved target does not lie under any allowed directory".to_string(),
            None,
            None,
        ),
    };
    PolicyViolation {
        violation_type: "directory_sandbox",
        tool_name: tool_name.to_string(),
        detail,
        matched_pattern: None,
        attempted_path: Some(requested.to_string()),
        resolved_path,
        is_symlink,
    }
}

/// Serializes JSON with stable (sorted) key order so forbidden-pattern
/// matching is deterministic regardless of the caller's field ordering
/// (spec §4.4 step 3 "canonical JSON string").
fn canonical_json(value: &serde_json::Value) -> String {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut sorted = serde_json::Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for k in keys {
                    sorted.insert(k.clone(), sort(&map[k]));
                }
                serde_json::Value::Object(sorted)
            }
            serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::config::PolicyConfig;
    use serde_json::json;

    fn policy(allowed: &[&str], forbidden: &[&str], patterns: &[&str], dirs: &[&str]) -> ToolPolicy {
        ToolPolicy {
            version: "v1".into(),
            allowed_tools: allowed.iter().map(|s| s.to_string()).collect(),
            forbidden_tools: forbidden.iter().map(|s| s.to_string()).collect(),
            forbidden_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            allowed_directories: dirs.iter().map(|s| s.to_string()).collect(),
            tool_hints: Default::default(),
        }
    }

    #[test]
    fn allowed_tools_blocks_absent_tool() {
        let p = CompiledPolicy::compile(&policy(&["Read"], &[], &[], &[]), &PolicyConfig::default()).unwrap();
        assert!(p.check("Write", &json!({})).is_err());
        assert!(p.check("Read", &json!({})).is_ok());
    }

    #[test]
    fn forbidden_tools_takes_precedence_over_allowed() {
        let pol = ToolPolicy {
            allowed_tools: vec!["Bash".into()],
            forbidden_tools: vec!["Bash".into()],
            ..policy(&[], &[], &[], &[])
        };
        let p = CompiledPolicy::compile(&pol, &PolicyConfig::default()).unwrap();
        let err = p.check("Bash", &json!({})).unwrap_err();
        assert_eq!(err.violation_type, "forbidden_tools");
    }

    #[test]
    fn forbidden_pattern_blocks_matching_arguments() {
        let p = CompiledPolicy::compile(
            &policy(&[], &[], &[r"rm\s+-rf"], &[]),
            &PolicyConfig::default(),
        )
        .unwrap();
        let err = p
            .check("Bash", &json!({"command": "rm -rf /tmp/x"}))
            .unwrap_err();
        assert_eq!(err.violation_type, "forbidden_patterns");
        assert_eq!(err.matched_pattern.as_deref(), Some(r"rm\s+-rf"));
    }

    #[test]
    fn forbidden_pattern_is_case_insensitive() {
        let p = CompiledPolicy::compile(&policy(&[], &[], &[r"drop table"], &[]), &PolicyConfig::default())
            .unwrap();
        assert!(p.check("Sql", &json!({"query": "DROP TABLE users"})).is_err());
    }

    #[test]
    fn strict_mode_rejects_bad_regex_at_compile_time() {
        let cfg = PolicyConfig {
            strict_pattern_compilation: true,
            ..PolicyConfig::default()
        };
        let result = CompiledPolicy::compile(&policy(&[], &[], &["(unclosed"], &[]), &cfg);
        assert!(result.is_err());
    }

    #[test]
    fn lenient_mode_skips_bad_regex() {
        let cfg = PolicyConfig {
            strict_pattern_compilation: false,
            ..PolicyConfig::default()
        };
        let result = CompiledPolicy::compile(&policy(&[], &[], &["(unclosed"], &[]), &cfg);
        assert!(result.is_ok());
    }

    #[test]
    fn directory_sandbox_blocks_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let p = CompiledPolicy::compile(
            &policy(&[], &[], &[], &[root.to_str().unwrap()]),
            &PolicyConfig::default(),
        )
        .unwrap();
        let err = p
            .check("Write", &json!({"path": "../../etc/shadow"}))
            .unwrap_err();
        assert_eq!(err.violation_type, "directory_sandbox");
    }

    #[test]
    fn directory_sandbox_allows_nested_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let p = CompiledPolicy::compile(
            &policy(&[], &[], &[], &[root.to_str().unwrap()]),
            &PolicyConfig::default(),
        )
        .unwrap();
        assert!(p.check("Write", &json!({"path": "src/new.rs"})).is_ok());
    }

    #[test]
    fn tool_call_with_no_path_parameter_skips_sandbox_check() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let p = CompiledPolicy::compile(
            &policy(&[], &[], &[], &[root.to_str().unwrap()]),
            &PolicyConfig::default(),
        )
        .unwrap();
        assert!(p.check("memory.search", &json!({"query": "hello"})).is_ok());
    }

    #[test]
    fn canonical_json_is_stable_under_key_reordering() {
        let a = canonical_json(&json!({"b": 1, "a": 2}));
        let b = canonical_json(&json!({"a": 2, "b": 1}));
        assert_eq!(a, b);
    }
}
