use ab_derive::Feature;
use ab_domain::config::AppConfig;
use ab_domain::validate_spec;

use crate::app::Harness;

pub fn derive(config: &AppConfig, feature_path: &str, dry_run: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(feature_path).map_err(|e| anyhow::anyhow!("reading {feature_path}: {e}"))?;
    let feature: Feature = serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {feature_path}: {e}"))?;

    let spec = ab_derive::derive(&feature);
    let validation = validate_spec(&spec);
    if !validation.is_valid() {
        anyhow::bail!(
            "derived spec failed validation: {}",
            validation.errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect::<Vec<_>>().join("; ")
        );
    }

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&spec)?);
        return Ok(());
    }

    let harness = Harness::open(&config.storage)?;
    harness.storage.insert_spec(&spec)?;
    println!("derived and stored spec `{}` (id {})", spec.name, spec.id);
    Ok(())
}
