use std::sync::Arc;

use ab_domain::config::AppConfig;
use ab_kernel::{CancelToken, HarnessKernel};
use uuid::Uuid;

use crate::app::Harness;
use crate::executor::NoopExecutor;

pub async fn run(config: &AppConfig, spec_name: &str, run_id: Option<Uuid>, json: bool) -> anyhow::Result<()> {
    let harness = Harness::open(&config.storage)?;

    let spec = harness
        .storage
        .find_spec_by_name(spec_name)?
        .ok_or_else(|| anyhow::anyhow!("no spec named `{spec_name}`"))?;

    let kernel = HarnessKernel::new(
        harness.storage.clone(),
        harness.recorder.clone(),
        config.retry,
        config.policy.clone(),
    );

    let ctx = ab_domain::ExecutionContext {
        project_root: std::env::current_dir()?,
        extra: serde_json::Value::Null,
    };
    let cancel = CancelToken::new();
    let run_id = run_id.unwrap_or_else(Uuid::new_v4);

    let result = kernel
        .run(&spec, run_id, Arc::new(NoopExecutor), &ctx, None, &cancel)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "run {} ({}): status={:?} turns_used={} verdict={:?}",
            result.id, spec_name, result.status, result.turns_used, result.acceptance_results.final_verdict
        );
    }
    Ok(())
}
