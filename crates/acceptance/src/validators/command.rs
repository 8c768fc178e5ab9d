use std::process::Stdio;
use std::time::{Duration, Instant};

use ab_domain::{Verdict, ValidatorResult};
use serde_json::Value;

use crate::gate::ValidatorContext;

/// `test_pass {command, timeout}` — runs a command, passes on zero exit
/// (spec §4.6).
pub fn validate_test_pass(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(command) = config.get("command").and_then(Value::as_str) else {
        return error("test_pass", "missing `command` in config");
    };
    let timeout_seconds = config.get("timeout").and_then(Value::as_u64);
    run_command("test_pass", command, timeout_seconds, ctx)
}

/// `lint_clean {command}` — passes on zero exit (spec §4.6).
pub fn validate_lint_clean(config: &Value, ctx: &ValidatorContext) -> ValidatorResult {
    let Some(command) = config.get("command").and_then(Value::as_str) else {
        return error("lint_clean", "missing `command` in config");
    };
    let timeout_seconds = config.get("timeout").and_then(Value::as_u64);
    run_command("lint_clean", command, timeout_seconds, ctx)
}

fn run_command(name: &str, command: &str, timeout_seconds: Option<u64>, ctx: &ValidatorContext) -> ValidatorResult {
    let mut child = match std::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(ctx.project_root)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return error(name, &format!("failed to spawn `{command}`: {e}")),
    };

    let deadline = timeout_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let passed = status.success();
                return ValidatorResult {
                    name: name.to_string(),
                    status: if passed { Verdict::Passed } else { Verdict::Failed },
                    detail: format!("`{command}` exited with {status}"),
                };
            }
            Ok(None) => {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return ValidatorResult {
                            name: name.to_string(),
                            status: Verdict::Error,
                            detail: format!("`{command}` timed out after {}s", timeout_seconds.unwrap_or(0)),
                        };
                    }
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => return error(name, &format!("error waiting on `{command}`: {e}")),
        }
    }
}

fn error(name: &str, detail: &str) -> ValidatorResult {
    ValidatorResult {
        name: name.to_string(),
        status: Verdict::Error,
        detail: detail.to_string(),
    }
}
