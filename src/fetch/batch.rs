use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::FetchSettings;
use crate::error::{AppError, Result};
use crate::prices::{PriceSample, PriceSeries};
use crate::timerange::Range;

use super::client::ClientRegistry;
use super::group::TaskGroup;
use super::query::{expand, AtomicQuery, BatchRequest};
use super::worker::fetch_prices;
use super::ensure_concurrency_limit;

/// Sizing for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub output_buffer: usize,
    pub chunk: Duration,
    pub page_size: u32,
}

impl BatchOptions {
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            concurrency: settings.concurrency,
            queue_capacity: settings.queue_capacity,
            output_buffer: settings.output_buffer,
            chunk: settings.chunk,
            page_size: settings.page_size,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_settings(&crate::config::Config::builtin().fetch)
    }
}

/// Completion side of a running batch.
pub struct BatchHandle {
    outcome: oneshot::Receiver<Result<()>>,
}

impl BatchHandle {
    /// Resolves once every producer and worker task has finished and the price stream is closed.
    /// Returns the first failure observed anywhere in the batch.
    pub async fn wait(self) -> Result<()> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(AppError::message(
                "batch supervisor exited without reporting an outcome",
            )),
        }
    }
}

/// Fetch every price sample for `request` over its lookback window ending now.
///
/// Must be called inside a Tokio runtime. Drain the returned receiver before calling
/// [`BatchHandle::wait`]: workers block on a full stream. Cancelling `cancel` stops the batch;
/// a failing batch never cancels `cancel` itself.
pub fn batch_fetch(
    cancel: &CancellationToken,
    options: BatchOptions,
    request: BatchRequest,
    registry: Arc<ClientRegistry>,
) -> (mpsc::Receiver<PriceSample>, BatchHandle) {
    match request.window_ending(Utc::now()) {
        Ok(window) => batch_fetch_window(cancel, options, request, window, registry),
        Err(err) => failed_batch(err),
    }
}

/// Same as [`batch_fetch`] over an explicit window.
pub fn batch_fetch_window(
    cancel: &CancellationToken,
    options: BatchOptions,
    request: BatchRequest,
    window: Range,
    registry: Arc<ClientRegistry>,
) -> (mpsc::Receiver<PriceSample>, BatchHandle) {
    let concurrency = ensure_concurrency_limit(options.concurrency);
    let token = cancel.child_token();
    let (queue_tx, queue_rx) = mpsc::channel::<AtomicQuery>(options.queue_capacity.max(1));
    let (prices_tx, prices_rx) = mpsc::channel::<PriceSample>(options.output_buffer.max(1));
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let delivered = Arc::new(AtomicUsize::new(0));

    info!(
        "Starting batch: {} regions, {} instance types, {} zones over {} with {} workers",
        request.regions().len(),
        request.instance_types().len(),
        request.availability_zones().len().max(1),
        window,
        concurrency
    );

    let mut group = TaskGroup::new(token.clone());
    group.spawn(produce(request, window, options.chunk, queue_tx, token.clone()));

    let queue = Arc::new(Mutex::new(queue_rx));
    for _ in 0..concurrency {
        group.spawn(work(
            Arc::clone(&queue),
            prices_tx.clone(),
            Arc::clone(&registry),
            options.page_size,
            Arc::clone(&delivered),
            token.clone(),
        ));
    }

    tokio::spawn(async move {
        let result = group.wait().await;
        // Workers hold the other senders; dropping this last one closes the stream.
        drop(prices_tx);

        match &result {
            Ok(()) => info!(
                "Batch finished: {} samples from {} regions",
                delivered.load(Ordering::SeqCst),
                registry.cached_regions()
            ),
            Err(err) => warn!(
                "Batch failed after {} samples: {}",
                delivered.load(Ordering::SeqCst),
                err
            ),
        }
        let _ = outcome_tx.send(result);
    });

    (
        prices_rx,
        BatchHandle {
            outcome: outcome_rx,
        },
    )
}

// A batch that never started: the stream is already closed and `wait` reports `err`.
fn failed_batch(err: AppError) -> (mpsc::Receiver<PriceSample>, BatchHandle) {
    let (_, prices_rx) = mpsc::channel(1);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let _ = outcome_tx.send(Err(err));
    (
        prices_rx,
        BatchHandle {
            outcome: outcome_rx,
        },
    )
}

/// Drain the stream, then check the batch outcome. Any failure discards the collected samples.
pub async fn collect_prices(
    prices: mpsc::Receiver<PriceSample>,
    handle: BatchHandle,
) -> Result<PriceSeries> {
    let series: PriceSeries = stream::unfold(prices, |mut prices| async move {
        prices.recv().await.map(|sample| (sample, prices))
    })
    .collect()
    .await;

    handle.wait().await?;
    Ok(series)
}

async fn produce(
    request: BatchRequest,
    window: Range,
    chunk: Duration,
    queue: mpsc::Sender<AtomicQuery>,
    token: CancellationToken,
) -> Result<()> {
    let queries = expand(&request, window, chunk);
    info!("Enqueueing {} price-history queries", queries.len());

    for query in queries {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AppError::Cancelled),
            sent = queue.send(query) => {
                // Workers only leave an open queue by failing, and each of them records its own
                // error. Reporting one here could race ahead of that root cause.
                if sent.is_err() {
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

async fn work(
    queue: Arc<Mutex<mpsc::Receiver<AtomicQuery>>>,
    prices: mpsc::Sender<PriceSample>,
    registry: Arc<ClientRegistry>,
    page_size: u32,
    delivered: Arc<AtomicUsize>,
    token: CancellationToken,
) -> Result<()> {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AppError::Cancelled),
            next = async { queue.lock().await.recv().await } => next,
        };
        let Some(query) = next else {
            return Ok(());
        };

        let client = registry.client(&query.region)?;
        let samples = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AppError::Cancelled),
            result = fetch_prices(client.as_ref(), &query, page_size) => result?,
        };

        for sample in samples {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AppError::Cancelled),
                sent = prices.send(sample) => {
                    sent.map_err(|_| AppError::StreamClosed)?;
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
}
