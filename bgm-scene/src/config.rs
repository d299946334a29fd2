//! Configuration resolution for bgm-scene
//!
//! Multi-tier resolution with CLI → ENV → TOML → default priority. When a
//! value is set in more than one tier the highest one wins and a warning is
//! logged.

use bgm_common::config::{TomlConfig, DEFAULT_BACKEND_URL};
use bgm_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_BACKEND_URL: &str = "BGM_BACKEND_URL";
pub const ENV_RECORD_URL: &str = "BGM_RECORD_URL";
pub const ENV_PORT: &str = "BGM_PORT";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub backend_url: Option<String>,
    pub record_url: Option<String>,
}

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub port: u16,
    pub backend_url: String,
    /// Record sink endpoint; forwarding is disabled when `None`
    pub record_url: Option<String>,
    pub words_per_second: f32,
    pub request_timeout: Duration,
}

pub fn resolve_settings(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<ServiceSettings> {
    let port = resolve_port(cli.port, toml_config.port)?;
    let backend_url = resolve_url(
        "Backend URL",
        ENV_BACKEND_URL,
        cli.backend_url.as_deref(),
        toml_config.backend_url.as_deref(),
    )
    .unwrap_or_else(|| {
        info!("Backend URL not configured, using default {}", DEFAULT_BACKEND_URL);
        DEFAULT_BACKEND_URL.to_string()
    });
    let record_url = resolve_url(
        "Record sink URL",
        ENV_RECORD_URL,
        cli.record_url.as_deref(),
        toml_config.record_url.as_deref(),
    );
    if record_url.is_none() {
        info!("Record sink not configured, evaluation records stay local");
    }

    Ok(ServiceSettings {
        port,
        backend_url,
        record_url,
        words_per_second: toml_config.words_per_second,
        request_timeout: Duration::from_secs(toml_config.request_timeout_secs.max(1)),
    })
}

fn resolve_port(cli_port: Option<u16>, toml_port: u16) -> Result<u16> {
    if let Some(port) = cli_port {
        return Ok(port);
    }
    match std::env::var(ENV_PORT) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid port: {:?}", ENV_PORT, raw))),
        Err(_) => Ok(toml_port),
    }
}

/// Pick a URL by priority, ignoring blank values
fn resolve_url(
    label: &str,
    env_var: &str,
    cli_value: Option<&str>,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = std::env::var(env_var).ok();
    let candidates = [
        ("command line", cli_value),
        ("environment", env_value.as_deref()),
        ("TOML", toml_value),
    ];

    let present: Vec<(&str, &str)> = candidates
        .iter()
        .filter_map(|(source, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (*source, v))
        })
        .collect();

    if present.len() > 1 {
        let sources: Vec<&str> = present.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    present.first().map(|(source, value)| {
        info!("{} loaded from {}", label, source);
        value.to_string()
    })
}
