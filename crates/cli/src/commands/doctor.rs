use ab_domain::config::AppConfig;
use chrono::Utc;

use crate::app::Harness;

/// Runs diagnostic checks against the current configuration and sweeps for
/// orphaned runs left `running`/`pending` by a previous process (spec
/// §4.12). Mirrors the teacher's `cli::doctor::run` — a short list of
/// pass/fail checks printed to stdout, returning `Ok(false)` (not an
/// error) when any check fails.
pub fn doctor(config: &AppConfig, config_path: &str) -> anyhow::Result<bool> {
    println!("ab-cli doctor");
    println!("=============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_bounds(config, &mut all_passed);
    check_observability(config);

    let harness = match Harness::open(&config.storage) {
        Ok(h) => h,
        Err(e) => {
            print_check("Storage opens", false, format!("{e}"));
            println!();
            println!("Some checks failed. Review the output above.");
            return Ok(false);
        }
    };
    print_check("Storage opens", true, config.storage.database_path.clone());

    let summary = ab_recovery::reconcile(&harness.storage, &harness.recorder, config.budget.max_timeout_seconds, Utc::now());
    let orphan_ok = summary.errors.is_empty();
    print_check(
        "Orphan recovery sweep",
        orphan_ok,
        format!("found={} cleaned={} skipped={}", summary.total_found, summary.cleaned_count, summary.skipped_count),
    );
    for e in &summary.errors {
        println!("      {e}");
    }
    if !orphan_ok {
        all_passed = false;
    }

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }
    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_bounds(config: &AppConfig, all_passed: &mut bool) {
    let ok = config.budget.min_max_turns <= config.budget.max_max_turns
        && config.budget.min_timeout_seconds <= config.budget.max_timeout_seconds;
    print_check(
        "Budget bounds sane",
        ok,
        format!(
            "max_turns=[{}, {}] timeout_seconds=[{}, {}]",
            config.budget.min_max_turns, config.budget.max_max_turns, config.budget.min_timeout_seconds, config.budget.max_timeout_seconds
        ),
    );
    if !ok {
        *all_passed = false;
    }
}

/// Reports whether OTLP export is configured. Never fails the overall
/// check — an unset `otlp_endpoint` just means JSON logging only.
fn check_observability(config: &AppConfig) {
    match &config.observability.otlp_endpoint {
        Some(endpoint) => print_check("OTLP export", true, format!("enabled, endpoint={endpoint}")),
        None => print_check("OTLP export", true, "disabled (JSON logging only)".to_string()),
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
