pub mod batch;
pub mod client;
pub mod group;
pub mod http;
pub mod query;
pub mod worker;

pub use batch::{batch_fetch, batch_fetch_window, collect_prices, BatchHandle, BatchOptions};
pub use client::{
    ClientFactory, ClientRegistry, PriceHistoryApi, PriceHistoryPage, PriceHistoryRequest,
    SpotPriceRecord,
};
pub use http::{http_client_factory, HttpPriceHistoryClient};
pub use query::{expand, AtomicQuery, BatchRequest};
pub use worker::fetch_prices;

/// Worker count used when the caller does not choose one.
pub const DEFAULT_CONCURRENCY: usize = 10;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
