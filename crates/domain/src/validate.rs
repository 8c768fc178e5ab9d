use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::spec::{AgentSpec, GateMode, TaskType};

/// Structural bounds on `max_turns` / `timeout_seconds` (spec §4.10). Kept
/// as constants the way the teacher keeps bounded defaults in
/// `domain/config/*` as free functions/consts rather than magic literals
/// scattered through call sites.
pub const MIN_MAX_TURNS: u32 = 1;
pub const MAX_MAX_TURNS: u32 = 500;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 24 * 60 * 60;

const KNOWN_VALIDATOR_TYPES: &[&str] = &[
    "file_exists",
    "test_pass",
    "forbidden_patterns",
    "lint_clean",
    "feature_passing",
    "feature_count",
];

/// One structural or bounds problem found in a spec (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a spec: zero or more field-level errors. A caller
/// chooses whether to raise or handle these locally via `into_result`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecValidationResult {
    pub errors: Vec<ValidationError>,
}

impl SpecValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), crate::error::Error> {
        if self.is_valid() {
            Ok(())
        } else {
            let joined = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            Err(crate::error::Error::SpecValidation(joined))
        }
    }
}

static NAME_PATTERN: once_cell_lite::Lazy<Regex> =
    once_cell_lite::Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

/// Validates a spec's structure and bounds before the kernel ever sees it
/// (spec §4.10). Never inspects runtime state — purely a function of the
/// spec's own fields.
pub fn validate_spec(spec: &AgentSpec) -> SpecValidationResult {
    let mut errors = Vec::new();

    if spec.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    } else if !NAME_PATTERN.is_match(&spec.name) {
        errors.push(ValidationError::new(
            "name",
            "must be lowercase, hyphenated (e.g. `feature-123-add-login`)",
        ));
    }

    if spec.display_name.trim().is_empty() {
        errors.push(ValidationError::new("display_name", "must not be empty"));
    }

    if spec.objective.trim().is_empty() {
        errors.push(ValidationError::new("objective", "must not be empty"));
    }

    // task_type is a closed Rust enum, so "in the enum" is a type-system
    // invariant rather than a runtime check; nothing to validate here
    // beyond what the type already guarantees. Matching keeps this
    // exhaustive so a future TaskType variant doesn't silently skip review.
    match spec.task_type {
        TaskType::Coding
        | TaskType::Testing
        | TaskType::Refactoring
        | TaskType::Documentation
        | TaskType::Audit
        | TaskType::Custom => {}
    }

    if spec.max_turns < MIN_MAX_TURNS || spec.max_turns > MAX_MAX_TURNS {
        errors.push(ValidationError::new(
            "max_turns",
            format!("must be within [{MIN_MAX_TURNS}, {MAX_MAX_TURNS}]"),
        ));
    }

    if spec.timeout_seconds < MIN_TIMEOUT_SECONDS || spec.timeout_seconds > MAX_TIMEOUT_SECONDS {
        errors.push(ValidationError::new(
            "timeout_seconds",
            format!("must be within [{MIN_TIMEOUT_SECONDS}, {MAX_TIMEOUT_SECONDS}]"),
        ));
    }

    if spec.tool_policy.version.trim().is_empty() {
        errors.push(ValidationError::new("tool_policy.version", "must not be empty"));
    }

    for (i, pattern) in spec.tool_policy.forbidden_patterns.iter().enumerate() {
        if Regex::new(pattern).is_err() {
            errors.push(ValidationError::new(
                format!("tool_policy.forbidden_patterns[{i}]"),
                format!("not a valid regex: {pattern}"),
            ));
        }
    }

    if spec.acceptance_spec.validators.is_empty() {
        errors.push(ValidationError::new(
            "acceptance_spec.validators",
            "must contain at least one validator",
        ));
    }
    for (i, v) in spec.acceptance_spec.validators.iter().enumerate() {
        if !KNOWN_VALIDATOR_TYPES.contains(&v.validator_type.as_str()) {
            errors.push(ValidationError::new(
                format!("acceptance_spec.validators[{i}].type"),
                format!("unknown validator type `{}`", v.validator_type),
            ));
        }
        if v.weight < 0.0 {
            errors.push(ValidationError::new(
                format!("acceptance_spec.validators[{i}].weight"),
                "must be non-negative",
            ));
        }
    }
    match spec.acceptance_spec.gate_mode {
        GateMode::AllPass | GateMode::AnyPass | GateMode::Weighted => {}
    }

    SpecValidationResult { errors }
}

/// A tiny `Lazy` shim so `ab-domain` does not need to pull in `once_cell`
/// or `lazy_static` as an extra dependency for a single regex — mirrors
/// the teacher's preference for one-off `std::sync::OnceLock` wrappers
/// over a dedicated crate for a single use site.
mod once_cell_lite {
    use std::sync::OnceLock;

    pub struct Lazy<T> {
        cell: OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Self {
                cell: OnceLock::new(),
                init,
            }
        }
    }

    impl<T> std::ops::Deref for Lazy<T> {
        type Target = T;
        fn deref(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{AcceptanceSpec, ToolPolicy, ValidatorSpec};
    use uuid::Uuid;

    fn valid_spec() -> AgentSpec {
        AgentSpec {
            id: Uuid::new_v4(),
            name: "feature-1-add-login".into(),
            display_name: "Add login".into(),
            objective: "Implement the login flow.".into(),
            task_type: TaskType::Coding,
            tool_policy: ToolPolicy::default(),
            max_turns: 10,
            timeout_seconds: 60,
            acceptance_spec: AcceptanceSpec {
                validators: vec![ValidatorSpec {
                    validator_type: "file_exists".into(),
                    config: serde_json::json!({"path": "src/login.rs", "should_exist": true}),
                    required: true,
                    weight: 1.0,
                }],
                gate_mode: GateMode::AllPass,
            },
            context: serde_json::Value::Null,
            tags: vec![],
            priority: 0,
            source_feature_id: None,
        }
    }

    #[test]
    fn valid_spec_has_no_errors() {
        let result = validate_spec(&valid_spec());
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn rejects_empty_name() {
        let mut s = valid_spec();
        s.name = "".into();
        let result = validate_spec(&s);
        assert!(result.errors.iter().any(|e| e.field == "name"));
    }

    #[test]
    fn rejects_non_slug_name() {
        let mut s = valid_spec();
        s.name = "Feature_1".into();
        let result = validate_spec(&s);
        assert!(result.errors.iter().any(|e| e.field == "name"));
    }

    #[test]
    fn rejects_out_of_bounds_max_turns() {
        let mut s = valid_spec();
        s.max_turns = 0;
        let result = validate_spec(&s);
        assert!(result.errors.iter().any(|e| e.field == "max_turns"));
    }

    #[test]
    fn rejects_invalid_forbidden_pattern_regex() {
        let mut s = valid_spec();
        s.tool_policy.forbidden_patterns.push("(unclosed".into());
        let result = validate_spec(&s);
        assert!(result
            .errors
            .iter()
            .any(|e| e.field.starts_with("tool_policy.forbidden_patterns")));
    }

    #[test]
    fn rejects_unknown_validator_type() {
        let mut s = valid_spec();
        s.acceptance_spec.validators[0].validator_type = "made_up".into();
        let result = validate_spec(&s);
        assert!(result
            .errors
            .iter()
            .any(|e| e.field.contains("validators[0].type")));
    }

    #[test]
    fn rejects_empty_validator_list() {
        let mut s = valid_spec();
        s.acceptance_spec.validators.clear();
        let result = validate_spec(&s);
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "acceptance_spec.validators"));
    }
}
