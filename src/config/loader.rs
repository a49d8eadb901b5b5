use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Context, Result};

use super::{validator, Config};

/// Load a JSON config file on top of [`Config::builtin`]. Every field is optional.
pub fn load_config(path: &Path) -> Result<Config> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config JSON at {}", path.display()))?;

    let config = parse_config(&json)
        .with_context(|| format!("failed to load config JSON at {}", path.display()))?;

    Ok(config)
}

pub fn parse_config(json: &str) -> Result<Config> {
    let raw: RawConfig = serde_json::from_str(json)?;
    let config = raw.apply(Config::builtin());
    validator::validate_config(&config)?;
    Ok(config)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    fetch: RawFetchSettings,
    #[serde(default)]
    api: RawApiSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFetchSettings {
    concurrency: Option<usize>,
    queue_capacity: Option<usize>,
    output_buffer: Option<usize>,
    chunk_hours: Option<u32>,
    product: Option<String>,
    page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApiSettings {
    endpoint: Option<String>,
    auth_header: Option<String>,
    timeout_secs: Option<u64>,
}

impl RawConfig {
    fn apply(self, mut config: Config) -> Config {
        let fetch = self.fetch;
        if let Some(value) = fetch.concurrency {
            config.fetch.concurrency = value;
        }
        if let Some(value) = fetch.queue_capacity {
            config.fetch.queue_capacity = value;
        }
        if let Some(value) = fetch.output_buffer {
            config.fetch.output_buffer = value;
        }
        if let Some(hours) = fetch.chunk_hours {
            config.fetch.chunk = chrono::Duration::hours(i64::from(hours));
        }
        if let Some(product) = fetch.product {
            config.fetch.product = product;
        }
        if let Some(value) = fetch.page_size {
            config.fetch.page_size = value;
        }

        let api = self.api;
        if let Some(endpoint) = api.endpoint {
            config.api.endpoint = endpoint;
        }
        if api.auth_header.is_some() {
            config.api.auth_header = api.auth_header;
        }
        if let Some(secs) = api.timeout_secs {
            config.api.timeout = Duration::from_secs(secs);
        }

        config
    }
}
