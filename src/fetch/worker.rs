use log::{debug, warn};

use crate::error::Result;
use crate::prices::PriceSample;

use super::client::{PriceHistoryApi, PriceHistoryRequest, SpotPriceRecord};
use super::query::AtomicQuery;

/// Run one atomic query to completion, following continuation tokens until the last page.
pub async fn fetch_prices(
    client: &dyn PriceHistoryApi,
    query: &AtomicQuery,
    page_size: u32,
) -> Result<Vec<PriceSample>> {
    debug!(
        "Fetching {} {} {} {}",
        query.region,
        query.instance_type,
        query.availability_zone.as_deref().unwrap_or("*"),
        query.range
    );

    let mut request = PriceHistoryRequest {
        instance_types: vec![query.instance_type.clone()],
        product_descriptions: vec![query.product_description.clone()],
        availability_zone: query.availability_zone.clone(),
        start_time: query.range.start(),
        end_time: query.range.end(),
        max_results: page_size,
        next_token: None,
    };

    let mut samples = Vec::new();
    loop {
        let page = client.describe_spot_price_history(&request).await?;
        samples.extend(
            page.spot_price_history
                .iter()
                .map(|record| to_sample(&query.region, record)),
        );

        match page.continuation() {
            Some(token) => request.next_token = Some(token.to_string()),
            None => break,
        }
    }

    Ok(samples)
}

fn to_sample(region: &str, record: &SpotPriceRecord) -> PriceSample {
    PriceSample {
        region: region.to_string(),
        instance_type: record.instance_type.clone(),
        availability_zone: record.availability_zone.clone(),
        price: parse_price(region, record),
        timestamp: record.timestamp,
    }
}

// Unparsable prices are kept as zero so one bad row does not sink the batch.
fn parse_price(region: &str, record: &SpotPriceRecord) -> f64 {
    match record.spot_price.trim().parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        _ => {
            warn!(
                "Treating malformed spot price {:?} as 0 ({} {} {} at {})",
                record.spot_price,
                region,
                record.instance_type,
                record.availability_zone,
                record.timestamp.to_rfc3339()
            );
            0.0
        }
    }
}
