mod command;
mod feature;
mod file_exists;
mod forbidden_patterns;

use ab_domain::{ValidatorResult, ValidatorSpec, Verdict};

use crate::gate::ValidatorContext;

/// Named-variant dispatch over the pluggable validator types (spec §9
/// "Dynamic dispatch over validators... model as a small set of named
/// variants"). Unknown types yield an `Error` verdict rather than panicking
/// — a malformed spec should already have been rejected by the spec
/// validator, but the gate stays defensive.
pub fn run(validator: &ValidatorSpec, ctx: &ValidatorContext) -> ValidatorResult {
    let mut result = match validator.validator_type.as_str() {
        "file_exists" => file_exists::validate(&validator.config, ctx),
        "test_pass" => command::validate_test_pass(&validator.config, ctx),
        "forbidden_patterns" => forbidden_patterns::validate(&validator.config, ctx),
        "lint_clean" => command::validate_lint_clean(&validator.config, ctx),
        "feature_passing" => feature::validate_passing(&validator.config, ctx),
        "feature_count" => feature::validate_count(&validator.config, ctx),
        other => ValidatorResult {
            name: other.to_string(),
            status: Verdict::Error,
            detail: format!("unknown validator type `{other}`"),
        },
    };
    if let Some(name) = validator.config.get("name").and_then(serde_json::Value::as_str) {
        result.name = name.to_string();
    }
    result
}
