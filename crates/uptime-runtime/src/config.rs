//! Configuration loading: optional JSON file, then environment overrides.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use uptime_submission::IngestConfig;

/// Load configuration from the process environment.
pub fn load_config() -> Result<IngestConfig> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Load configuration using `lookup` to resolve environment variables.
///
/// `UPTIME_CONFIG_FILE` names an optional JSON document; every field it
/// omits keeps its default. `UPTIME_*` variables are applied on top.
pub fn load_config_from<F>(lookup: F) -> Result<IngestConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup("UPTIME_CONFIG_FILE") {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            let config: IngestConfig = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path))?;
            info!(path = %path, "Loaded configuration file");
            config
        }
        None => IngestConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup);
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut IngestConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = parsed(lookup, "UPTIME_LISTEN_PORT") {
        config.http.port = port;
    }
    if let Some(network) = lookup("UPTIME_NETWORK") {
        config.network_name = network;
    }
    if let Some(max) = parsed(lookup, "UPTIME_REQUESTS_PER_PK_HOURLY") {
        config.rate_limit.max_attempts = max;
    }

    if let Some(disabled) = flag(lookup, "UPTIME_WHITELIST_DISABLED") {
        config.whitelist.disabled = disabled;
    }
    if let Some(file) = lookup("UPTIME_WHITELIST_FILE") {
        config.whitelist.file = Some(PathBuf::from(file));
    }
    if let Some(url) = lookup("UPTIME_WHITELIST_URL") {
        config.whitelist.url = Some(url);
    }
    if let Some(secs) = parsed(lookup, "UPTIME_WHITELIST_REFRESH_SECS") {
        config.whitelist.refresh_interval_secs = secs;
    }

    if let Some(disabled) = flag(lookup, "UPTIME_VERIFY_SIGNATURE_DISABLED") {
        config.verify_signature_disabled = disabled;
    }
    if let Some(path) = lookup("UPTIME_STORAGE_PATH") {
        config.storage.local_path = Some(PathBuf::from(path));
    }
}

fn parsed<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

fn flag<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}
