use ab_domain::{validate_spec, AgentSpec};

pub fn validate(spec_path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(spec_path).map_err(|e| anyhow::anyhow!("reading {spec_path}: {e}"))?;
    let spec: AgentSpec = serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {spec_path}: {e}"))?;

    let result = validate_spec(&spec);
    if result.is_valid() {
        println!("{spec_path}: valid");
        Ok(())
    } else {
        println!("{spec_path}: {} error(s)", result.errors.len());
        for e in &result.errors {
            println!("  {}: {}", e.field, e.message);
        }
        std::process::exit(1);
    }
}
