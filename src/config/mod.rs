use std::time::Duration;

pub mod loader;
pub mod validator;

pub use loader::load_config;

pub const DEFAULT_PRODUCT: &str = "Linux/UNIX (Amazon VPC)";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/regions/{region}/spot-price-history";

/// Upper bound the price-history API accepts for a single page.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Longest query window accepted, in hours.
pub const MAX_CHUNK_HOURS: i64 = 24 * 7;

/// Pipeline sizing and query shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Number of workers issuing API calls at once.
    pub concurrency: usize,
    /// Queries buffered ahead of the workers.
    pub queue_capacity: usize,
    /// Samples buffered ahead of the consumer.
    pub output_buffer: usize,
    /// Length of each query window. Small enough to stay under the API's silent row cap.
    pub chunk: chrono::Duration,
    pub product: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    /// URL template; `{region}` is replaced per client.
    pub endpoint: String,
    /// Authorization header template, `${VAR}` placeholders are read from the environment.
    pub auth_header: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fetch: FetchSettings,
    pub api: ApiSettings,
}

impl Config {
    pub fn builtin() -> Self {
        Config {
            fetch: FetchSettings {
                concurrency: crate::fetch::DEFAULT_CONCURRENCY,
                queue_capacity: 100,
                output_buffer: 256,
                chunk: chrono::Duration::hours(4),
                product: DEFAULT_PRODUCT.to_string(),
                page_size: MAX_PAGE_SIZE,
            },
            api: ApiSettings {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                auth_header: None,
                timeout: Duration::from_secs(30),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}
