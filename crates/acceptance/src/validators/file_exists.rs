use ab_domain::{Verdict, ValidatorResult};
use serde_json::Value;

use crate::gate::ValidatorContext;

/// `file_exists {path, should_exist}` — checks filesystem presence
/// relative to the project directory (spec §4.6).
pub fn validate(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(path) = config.get("path").and_then(Value::as_str) else {
        return error("missing `path` in config");
    };
    let should_exist = config.get("should_exist").and_then(Value::as_bool).unwrap_or(true);
    let exists = ctx.project_root.join(path).exists();
    let status = if exists == should_exist { Verdict::Passed } else { Verdict::Failed };
    ValidatorResult {
        name: "file_exists".to_string(),
        status,
        detail: format!("`{path}` exists={exists}, expected should_exist={should_exist}"),
    }
}

fn error(detail: &str) -> ValidatorResult {
    ValidatorResult {
        name: "file_exists".to_string(),
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
    fn passes_when_existing_file_should_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.txt"), "x").unwrap();
        let result = validate(&serde_json::json!({ "path": "out.txt", "should_exist": true }), &ctx(dir.path()));
        assert_eq!(result.status, Verdict::Passed);
    }

    #[test]
    fn fails_when_file_missing_but_should_exist() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(&serde_json::json!({ "path": "missing.txt" }), &ctx(dir.path()));
        assert_eq!(result.status, Verdict::Failed);
    }

    #[test]
    fn passes_when_should_not_exist_and_absent() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(&serde_json::json!({ "path": "absent.txt", "should_exist": false }), &ctx(dir.path()));
        assert_eq!(result.status, Verdict::Passed);
    }

    #[test]
    fn errors_on_missing_config_field() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(&serde_json::json!({}), &ctx(dir.path()));
        assert_eq!(result.status, Verdict::Error);
    }
}
