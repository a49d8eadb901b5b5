use crate::error::{AppError, Result};

use super::{Config, MAX_CHUNK_HOURS, MAX_PAGE_SIZE};

/// Validate a fully merged config and surface every problem at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_fetch(config, &mut issues);
    validate_api(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(issues))
    }
}

fn validate_fetch(config: &Config, issues: &mut Vec<String>) {
    let fetch = &config.fetch;

    if fetch.concurrency == 0 {
        issues.push("fetch.concurrency must be at least 1".to_string());
    }
    if fetch.queue_capacity == 0 {
        issues.push("fetch.queue_capacity must be at least 1".to_string());
    }
    if fetch.output_buffer == 0 {
        issues.push("fetch.output_buffer must be at least 1".to_string());
    }
    if fetch.chunk <= chrono::Duration::zero() {
        issues.push("fetch.chunk_hours must be positive".to_string());
    } else if fetch.chunk > chrono::Duration::hours(MAX_CHUNK_HOURS) {
        issues.push(format!(
            "fetch.chunk_hours must be at most {MAX_CHUNK_HOURS}"
        ));
    }
    if fetch.product.trim().is_empty() {
        issues.push("fetch.product must not be empty".to_string());
    }
    if fetch.page_size == 0 || fetch.page_size > MAX_PAGE_SIZE {
        issues.push(format!(
            "fetch.page_size must be between 1 and {MAX_PAGE_SIZE}"
        ));
    }
}

fn validate_api(config: &Config, issues: &mut Vec<String>) {
    let api = &config.api;

    if api.endpoint.trim().is_empty() {
        issues.push("api.endpoint must not be empty".to_string());
    } else if !api.endpoint.contains("{region}") {
        issues.push("api.endpoint must contain a `{region}` placeholder".to_string());
    }
    if api
        .auth_header
        .as_deref()
        .is_some_and(|header| header.trim().is_empty())
    {
        issues.push("api.auth_header must not be blank when set".to_string());
    }
    if api.timeout.is_zero() {
        issues.push("api.timeout_secs must be positive".to_string());
    }
}
