use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, Result};
use crate::timerange::Range;

/// Longest lookback accepted. The provider keeps far less history than this.
pub const MAX_LOOKBACK_DAYS: u32 = 365;

/// A user-level acquisition request: every region x instance type x zone over a lookback window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    instance_types: Vec<String>,
    regions: Vec<String>,
    availability_zones: Vec<String>,
    product_description: String,
    lookback_days: u32,
}

impl BatchRequest {
    pub fn new(
        instance_types: Vec<String>,
        regions: Vec<String>,
        availability_zones: Vec<String>,
        product_description: impl Into<String>,
        lookback_days: u32,
    ) -> Result<Self> {
        if instance_types.is_empty() {
            return Err(AppError::invalid_request(
                "at least one instance type is required",
            ));
        }
        if regions.is_empty() {
            return Err(AppError::invalid_request("at least one region is required"));
        }
        if lookback_days == 0 {
            return Err(AppError::invalid_request("lookback days must be positive"));
        }
        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(AppError::invalid_request(format!(
                "lookback days must be at most {MAX_LOOKBACK_DAYS}"
            )));
        }

        Ok(Self {
            instance_types,
            regions,
            availability_zones,
            product_description: product_description.into(),
            lookback_days,
        })
    }

    pub fn instance_types(&self) -> &[String] {
        &self.instance_types
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn availability_zones(&self) -> &[String] {
        &self.availability_zones
    }

    pub fn product_description(&self) -> &str {
        &self.product_description
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// The lookback window ending at `now`.
    pub fn window_ending(&self, now: DateTime<Utc>) -> Result<Range> {
        Range::days_ago(now, self.lookback_days)
    }
}

/// One API call's worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicQuery {
    pub region: String,
    pub instance_type: String,
    /// `None` asks for every zone in the region.
    pub availability_zone: Option<String>,
    pub product_description: String,
    pub range: Range,
}

/// Flatten a batch request into atomic queries, ordered region, instance type, zone, chunk.
/// Duplicate inputs produce duplicate queries. Queries are built lazily, one per `next`.
pub fn expand(request: &BatchRequest, window: Range, chunk: Duration) -> Queries<'_> {
    let zones = if request.availability_zones.is_empty() {
        vec![None]
    } else {
        request
            .availability_zones
            .iter()
            .map(|zone| Some(zone.as_str()))
            .collect()
    };
    let chunks = window.split(chunk);
    let total =
        request.regions.len() * request.instance_types.len() * zones.len() * chunks.len();

    Queries {
        request,
        zones,
        chunks,
        next: 0,
        total,
    }
}

/// Iterator returned by [`expand`].
#[derive(Debug, Clone)]
pub struct Queries<'a> {
    request: &'a BatchRequest,
    zones: Vec<Option<&'a str>>,
    chunks: Vec<Range>,
    next: usize,
    total: usize,
}

impl Iterator for Queries<'_> {
    type Item = AtomicQuery;

    fn next(&mut self) -> Option<AtomicQuery> {
        if self.next >= self.total {
            return None;
        }
        let idx = self.next;
        self.next += 1;

        // Mixed-radix index: chunk varies fastest, region slowest.
        let per_zone = self.chunks.len();
        let per_type = per_zone * self.zones.len();
        let per_region = per_type * self.request.instance_types.len();

        Some(AtomicQuery {
            region: self.request.regions[idx / per_region].clone(),
            instance_type: self.request.instance_types[idx % per_region / per_type].clone(),
            availability_zone: self.zones[idx % per_type / per_zone].map(str::to_string),
            product_description: self.request.product_description.clone(),
            range: self.chunks[idx % per_zone],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Queries<'_> {}
