use ab_domain::ViolationAggregation;

use crate::enforcer::PolicyViolation;

/// Incrementally folds one blocked call into the run's violation
/// aggregation (spec §4.4: "updated incrementally on each violation").
pub fn record_violation(aggregation: &mut ViolationAggregation, violation: &PolicyViolation, turn_number: u32) {
    aggregation.total_count += 1;
    *aggregation
        .by_type
        .entry(violation.violation_type.to_string())
        .or_insert(0) += 1;
    *aggregation.by_tool.entry(violation.tool_name.clone()).or_insert(0) += 1;
    aggregation.last_turn = Some(turn_number);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(violation_type: &'static str, tool_name: &str) -> PolicyViolation {
        PolicyViolation {
            violation_type,
            tool_name: tool_name.to_string(),
            detail: "x".into(),
            matched_pattern: None,
            attempted_path: None,
            resolved_path: None,
            is_symlink: None,
        }
    }

    #[test]
    fn aggregates_counts_by_type_and_tool() {
        let mut agg = ViolationAggregation::default();
        record_violation(&mut agg, &violation("forbidden_patterns", "Bash"), 1);
        record_violation(&mut agg, &violation("forbidden_patterns", "Bash"), 2);
        record_violation(&mut agg, &violation("directory_sandbox", "Write"), 3);

        assert_eq!(agg.total_count, 3);
        assert_eq!(agg.by_type["forbidden_patterns"], 2);
        assert_eq!(agg.by_type["directory_sandbox"], 1);
        assert_eq!(agg.by_tool["Bash"], 2);
        assert_eq!(agg.by_tool["Write"], 1);
        assert_eq!(agg.last_turn, Some(3));
    }
}
