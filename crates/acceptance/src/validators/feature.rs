use ab_domain::{Verdict, ValidatorResult};
use serde_json::Value;

use crate::gate::ValidatorContext;

/// `feature_passing {feature_id}` — external signal that a tracked feature
/// reached a done state (spec §4.6). The tracker itself is an external
/// collaborator; see `FeatureStatusProvider`.
pub fn validate_passing(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(feature_id) = config.get("feature_id").and_then(Value::as_str) else {
        return error("feature_passing", "missing `feature_id` in config");
    };
    let Some(provider) = ctx.feature_status else {
        return error("feature_passing", "no feature status provider configured");
    };
    let done = provider.is_feature_done(feature_id);
    ValidatorResult {
        name: "feature_passing".to_string(),
        status: if done { Verdict::Passed } else { Verdict::Failed },
        detail: format!("feature `{feature_id}` done={done}"),
    }
}

/// `feature_count {expected_count}` — count comparison against the number
/// of completed features the external tracker reports.
pub fn validate_count(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(expected) = config.get("expected_count").and_then(Value::as_u64) else {
        return error("feature_count", "missing `expected_count` in config");
    };
    let Some(provider) = ctx.feature_status else {
        return error("feature_count", "no feature status provider configured");
    };
    let actual = provider.completed_feature_count();
    ValidatorResult {
        name: "feature_count".to_string(),
        status: if actual == expected { Verdict::Passed } else { Verdict::Failed },
        detail: format!("completed_feature_count={actual}, expected={expected}"),
    }
}

fn error(name: &str, detail: &str) -> ValidatorResult {
    ValidatorResult {
        name: name.to_string(),
        status: Verdict::Error,
        detail: detail.to_string(),
    }
}
