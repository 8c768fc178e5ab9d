use ab_domain::config::AppConfig;
use ab_events::{debug_context, replay as replay_events};
use uuid::Uuid;

use crate::app::Harness;

pub fn replay(config: &AppConfig, run_id: Uuid, debug: bool) -> anyhow::Result<()> {
    let harness = Harness::open(&config.storage)?;

    if debug {
        let run = harness
            .storage
            .get_run(run_id)?
            .ok_or_else(|| anyhow::anyhow!("no run {run_id}"))?;
        let events = harness.storage.list_events(run_id)?;
        let ctx = debug_context(&run, &events);
        println!("status: {:?}", ctx.run_status);
        println!("failure_reason: {:?}", ctx.failure_reason);
        println!("turns_used: {}", ctx.turns_used);
        println!("tokens_used: {}", ctx.tokens_used);
        println!("last_tool_call: {}", ctx.last_tool_call.map(|v| v.to_string()).unwrap_or_else(|| "none".into()));
        println!("last_tool_result: {}", ctx.last_tool_result.map(|v| v.to_string()).unwrap_or_else(|| "none".into()));
        return Ok(());
    }

    let result = replay_events(&harness.storage, &harness.artifacts, run_id)?;
    if !result.is_valid {
        eprintln!("warning: event sequence has a gap for run {run_id}");
    }
    for replayed in &result.events {
        println!(
            "[{}] seq={} {} {}",
            replayed.event.timestamp.to_rfc3339(),
            replayed.event.sequence,
            replayed.event.event_type.as_str(),
            replayed.full_payload
        );
    }
    Ok(())
}
