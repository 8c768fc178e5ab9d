use std::path::Path;

use ab_domain::{AcceptanceResults, AcceptanceSpec, GateMode, ValidatorResult, Verdict, ViolationAggregation};

use crate::validators;

/// External collaborator for the `feature_passing`/`feature_count`
/// validators — the feature tracker itself is out of scope (spec §1).
pub trait FeatureStatusProvider: Send + Sync {
    fn is_feature_done(&self, feature_id: &str) -> bool;
    fn completed_feature_count(&self) -> u64;
}

/// Everything a validator needs to run: the project directory every
/// relative path resolves against, and an optional feature status
/// collaborator.
pub struct ValidatorContext<'a> {
    pub project_root: &'a Path,
    pub feature_status: Option<&'a dyn FeatureStatusProvider>,
}

/// Runs every validator in `spec` and combines their outcomes per
/// `gate_mode` (spec §4.6). `existing_aggregation` is carried through
/// unchanged — violation counts are owned by the policy enforcer, not the
/// gate. `partial` marks results produced against an unfinished run
/// (budget exhaustion or cancellation).
pub fn run_gate(
    spec: &AcceptanceSpec,
    ctx: &ValidatorContext,
    existing_aggregation: ViolationAggregation,
    partial: bool,
) -> AcceptanceResults {
    let results: Vec<(bool, f64, ValidatorResult)> = spec
        .validators
        .iter()
        .map(|v| (v.required, v.weight, validators::run(v, ctx)))
        .collect();

    let final_verdict = Some(combine(spec.gate_mode, &results));

    AcceptanceResults {
        validator_results: results.into_iter().map(|(_, _, r)| r).collect(),
        final_verdict,
        violation_aggregation: existing_aggregation,
        partial,
    }
}

fn combine(gate_mode: GateMode, results: &[(bool, f64, ValidatorResult)]) -> Verdict {
    match gate_mode {
        GateMode::AllPass => {
            let required_ok = results
                .iter()
                .filter(|(required, _, _)| *required)
                .all(|(_, _, r)| r.status == Verdict::Passed);
            if required_ok { Verdict::Passed } else { Verdict::Failed }
        }
        GateMode::AnyPass => {
            if results.iter().any(|(_, _, r)| r.status == Verdict::Passed) {
                Verdict::Passed
            } else {
                Verdict::Failed
            }
        }
        GateMode::Weighted => {
            let total: f64 = results.iter().map(|(_, weight, _)| weight.max(0.0)).sum();
            if total <= 0.0 {
                return Verdict::Passed;
            }
            let passed: f64 = results
                .iter()
                .filter(|(_, _, r)| r.status == Verdict::Passed)
                .map(|(_, weight, _)| weight.max(0.0))
                .sum();
            if passed >= total / 2.0 { Verdict::Passed } else { Verdict::Failed }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::{GateMode, ValidatorSpec};

    fn spec(validators: Vec<ValidatorSpec>, gate_mode: GateMode) -> AcceptanceSpec {
        AcceptanceSpec { validators, gate_mode }
    }

    fn validator(validator_type: &str, required: bool, weight: f64, config: serde_json::Value) -> ValidatorSpec {
        ValidatorSpec {
            validator_type: validator_type.to_string(),
            config,
            required,
            weight,
        }
    }

    #[test]
    fn all_pass_fails_if_any_required_validator_fails() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(
            vec![
                validator("file_exists", true, 1.0, serde_json::json!({ "path": "missing.txt" })),
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "true" })),
            ],
            GateMode::AllPass,
        );
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), false);
        assert_eq!(results.final_verdict, Some(Verdict::Failed));
    }

    #[test]
    fn all_pass_ignores_failing_non_required_validator() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(
            vec![
                validator("file_exists", false, 1.0, serde_json::json!({ "path": "missing.txt" })),
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "true" })),
            ],
            GateMode::AllPass,
        );
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), false);
        assert_eq!(results.final_verdict, Some(Verdict::Passed));
    }

    #[test]
    fn any_pass_passes_if_one_validator_passes() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(
            vec![
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "false" })),
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "true" })),
            ],
            GateMode::AnyPass,
        );
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), false);
        assert_eq!(results.final_verdict, Some(Verdict::Passed));
    }

    #[test]
    fn weighted_majority_passes_on_tie() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(
            vec![
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "true" })),
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "false" })),
            ],
            GateMode::Weighted,
        );
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), false);
        assert_eq!(results.final_verdict, Some(Verdict::Passed));
    }

    #[test]
    fn weighted_below_half_fails() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(
            vec![
                validator("test_pass", true, 1.0, serde_json::json!({ "command": "true" })),
                validator("test_pass", true, 3.0, serde_json::json!({ "command": "false" })),
            ],
            GateMode::Weighted,
        );
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), false);
        assert_eq!(results.final_verdict, Some(Verdict::Failed));
    }

    #[test]
    fn partial_flag_is_carried_through() {
        let dir = tempfile::tempdir().unwrap();
        let s = spec(vec![], GateMode::AllPass);
        let ctx = ValidatorContext { project_root: dir.path(), feature_status: None };
        let results = run_gate(&s, &ctx, ViolationAggregation::default(), true);
        assert!(results.partial);
    }
}
