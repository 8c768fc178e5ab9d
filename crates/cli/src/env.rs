//! Environment-variable parsing for the two flags the harness's external
//! interface recognizes (spec §6). Kept as free functions rather than a
//! config struct since both are read once, at process startup, by the CLI
//! boundary — nothing downstream needs to see the raw env var.

const TRUTHY: &[&str] = &["1", "true", "yes", "on"];
const FALSY: &[&str] = &["0", "false", "no", "off", ""];

/// `USE_KERNEL` — truthy routes feature execution through the kernel path;
/// defaults to `false` for backwards compatibility when unset or when the
/// value is neither truthy nor falsy.
pub fn use_kernel() -> bool {
    match std::env::var("USE_KERNEL") {
        Ok(raw) => parse_bool_flag(&raw).unwrap_or(false),
        Err(_) => false,
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    let lower = raw.to_ascii_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

const KNOWN_ICON_PROVIDERS: &[&str] = &["default", "none"];
const DEFAULT_ICON_PROVIDER: &str = "default";

/// `ICON_PROVIDER` — selects a static icon-generation backend. Icon
/// generation itself is out of scope for this harness; this helper exists
/// only because the CLI is the boundary that would read the variable, and
/// an invalid value must silently fall back rather than error.
pub fn icon_provider() -> String {
    match std::env::var("ICON_PROVIDER") {
        Ok(raw) if KNOWN_ICON_PROVIDERS.contains(&raw.as_str()) => raw,
        _ => DEFAULT_ICON_PROVIDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_are_case_insensitive() {
        for v in ["1", "TRUE", "Yes", "ON"] {
            assert_eq!(parse_bool_flag(v), Some(true), "{v}");
        }
    }

    #[test]
    fn falsy_values_include_empty_string() {
        for v in ["0", "false", "No", "OFF", ""] {
            assert_eq!(parse_bool_flag(v), Some(false), "{v}");
        }
    }

    #[test]
    fn unrecognized_value_parses_to_none() {
        assert_eq!(parse_bool_flag("maybe"), None);
    }

    #[test]
    fn unknown_icon_provider_falls_back_to_default() {
        std::env::remove_var("ICON_PROVIDER");
        assert_eq!(icon_provider(), "default");
    }
}
