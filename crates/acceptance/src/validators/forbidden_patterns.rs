use ab_domain::{Verdict, ValidatorResult};
use regex::Regex;
use serde_json::Value;

use crate::gate::ValidatorContext;

/// `forbidden_patterns {patterns[], target}` — scans a target file
/// (relative to the project directory) and fails on any hit (spec §4.6).
pub fn validate(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(patterns) = config.get("patterns").and_then(Value::as_array) else {
        return error("missing `patterns` in config");
    };
    let Some(target) = config.get("target").and_then(Value::as_str) else {
        return error("missing `target` in config");
    };

    let content = match std::fs::read_to_string(ctx.project_root.join(target)) {
        Ok(content) => content,
        Err(e) => return error(&format!("could not read `{target}`: {e}")),
    };

    for pattern in patterns {
        let Some(pattern) = pattern.as_str() else {
            return error("non-string entry in `patterns`");
        };
        let re = match Regex::new(&format!("(?i){pattern}")) {
            Ok(re) => re,
            Err(e) => return error(&format!("invalid pattern `{pattern}`: {e}")),
        };
        if re.is_match(&content) {
            return ValidatorResult {
                name: "forbidden_patterns".to_string(),
                status: Verdict::Failed,
                detail: format!("`{target}` matched forbidden pattern `{pattern}`"),
            };
        }
    }

    ValidatorResult {
        name: "forbidden_patterns".to_string(),
        status: Verdict::Passed,
        detail: format!("`{target}` matched none of {} forbidden patterns", patterns.len()),
    }
}

fn error(detail: &str) -> ValidatorResult {
    ValidatorResult {
        name: "forbidden_patterns".to_string(),
        status: Verdict::Error,
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ctx(root: &Path) -> ValidatorContext<'_> {
        ValidatorContext { project_root: root, feature_status: None }
    }

    #[test]
    fn fails_on_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.log"), "running rm -rf /tmp/x now").unwrap();
        let result = validate(
            &serde_json::json!({ "patterns": [r"rm\s+-rf"], "target": "out.log" }),
            &ctx(dir.path()),
        );
        assert_eq!(result.status, Verdict::Failed);
    }

    #[test]
    fn passes_when_no_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.log"), "all clear").unwrap();
        let result = validate(
            &serde_json::json!({ "patterns": [r"rm\s+-rf"], "target": "out.log" }),
            &ctx(dir.path()),
        );
        assert_eq!(result.status, Verdict::Passed);
    }

    #[test]
    fn errors_when_target_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(&serde_json::json!({ "patterns": [], "target": "nope.log" }), &ctx(dir.path()));
        assert_eq!(result.status, Verdict::Error);
    }
}
