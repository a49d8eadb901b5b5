use std::io;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::{load_config, validator::validate_config, Config};
use crate::error::Result;
use crate::fetch::{
    batch_fetch_window, collect_prices, http_client_factory, BatchOptions, BatchRequest,
    ClientRegistry,
};
use crate::prices::PriceSeries;
use crate::report::{write_report, ReportScope};
use crate::timerange::Range;

/// Resolve configuration, fetch the requested history and print the report to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    let regions = cli.regions();
    let instance_types = cli.instance_types();
    let request = BatchRequest::new(
        instance_types.clone(),
        regions.clone(),
        cli.availability_zones()?,
        config.fetch.product.clone(),
        cli.days,
    )?;
    let window = request.window_ending(Utc::now())?;

    let registry = Arc::new(ClientRegistry::new(http_client_factory(config.api.clone())));
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let prices = run_analysis(
        &cancel,
        BatchOptions::from_settings(&config.fetch),
        request,
        window,
        registry,
    )
    .await?;
    info!("Collected {} price samples", prices.len());

    let scope = ReportScope {
        regions: &regions,
        instance_types: &instance_types,
        window,
        days: cli.days,
        max_bid: cli.max_bid(),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, cli.format, &prices, &scope)
}

/// Run one batch over `window` and gather every sample, or the first error.
pub async fn run_analysis(
    cancel: &CancellationToken,
    options: BatchOptions,
    request: BatchRequest,
    window: Range,
    registry: Arc<ClientRegistry>,
) -> Result<PriceSeries> {
    let (prices, handle) = batch_fetch_window(cancel, options, request, window, registry);
    collect_prices(prices, handle).await
}

/// Built-in defaults, overlaid by the config file, overlaid by command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::builtin(),
    };

    if let Some(concurrency) = cli.concurrency {
        config.fetch.concurrency = concurrency;
    }
    if let Some(hours) = cli.chunk_hours {
        config.fetch.chunk = Duration::hours(i64::from(hours));
    }
    if let Some(product) = &cli.product {
        config.fetch.product = product.clone();
    }

    validate_config(&config)?;
    Ok(config)
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    warn!("Interrupted, cancelling outstanding price-history requests");
                    cancel.cancel();
                }
                Err(err) => warn!("Failed to listen for Ctrl-C: {}", err),
            },
        }
    });
}
