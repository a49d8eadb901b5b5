use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Parameters of one page request against the price-history API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryRequest {
    pub instance_types: Vec<String>,
    pub product_descriptions: Vec<String>,
    pub availability_zone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_results: u32,
    pub next_token: Option<String>,
}

/// A price record as the provider sends it. The price stays textual until the worker parses it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpotPriceRecord {
    pub instance_type: String,
    pub availability_zone: String,
    #[serde(default)]
    pub product_description: String,
    pub spot_price: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceHistoryPage {
    #[serde(default)]
    pub spot_price_history: Vec<SpotPriceRecord>,
    /// Continuation for the next page; absent or empty on the last page.
    #[serde(default)]
    pub next_token: Option<String>,
}

impl PriceHistoryPage {
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// A region-bound client for the spot price-history API.
#[async_trait]
pub trait PriceHistoryApi: Send + Sync {
    async fn describe_spot_price_history(
        &self,
        request: &PriceHistoryRequest,
    ) -> Result<PriceHistoryPage>;
}

/// Builds a client for a region. Called at most once per region per registry.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, region: &str) -> Result<Arc<dyn PriceHistoryApi>>;
}

impl<F> ClientFactory for F
where
    F: Fn(&str) -> Result<Arc<dyn PriceHistoryApi>> + Send + Sync,
{
    fn connect(&self, region: &str) -> Result<Arc<dyn PriceHistoryApi>> {
        self(region)
    }
}

/// Per-run cache of region clients, shared by all workers of a batch.
pub struct ClientRegistry {
    factory: Box<dyn ClientFactory>,
    clients: Mutex<HashMap<String, Arc<dyn PriceHistoryApi>>>,
}

impl ClientRegistry {
    pub fn new(factory: impl ClientFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached client for `region`, creating it on first use.
    pub fn client(&self, region: &str) -> Result<Arc<dyn PriceHistoryApi>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| AppError::message("Failed to lock price-history client cache"))?;

        if let Some(client) = clients.get(region) {
            return Ok(Arc::clone(client));
        }

        log::debug!("Creating price-history client for {}", region);
        let client = self.factory.connect(region)?;
        clients.insert(region.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub fn cached_regions(&self) -> usize {
        self.clients.lock().map(|clients| clients.len()).unwrap_or(0)
    }
}
