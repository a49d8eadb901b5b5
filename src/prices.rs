use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timerange::{partition_index, Range};

/// One observed spot price for an instance type in a zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSample {
    pub region: String,
    pub instance_type: String,
    pub availability_zone: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Samples in the order they arrived from the fetch pipeline. Arrival order says
/// nothing about timestamps; sort or bucket explicitly when order matters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: PriceSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceSample> {
        self.samples.iter()
    }

    /// Highest price, or `0.0` when there are no samples.
    pub fn max(&self) -> f64 {
        self.samples
            .iter()
            .map(|sample| sample.price)
            .fold(0.0, f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|sample| sample.price)
            .reduce(f64::min)
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(|sample| sample.price).sum();
        Some(total / self.samples.len() as f64)
    }

    /// Samples whose timestamp falls inside `range` (inclusive).
    pub fn subset(&self, range: &Range) -> PriceSeries {
        self.filtered(|sample| range.contains(sample.timestamp))
    }

    pub fn by_region(&self, region: &str) -> PriceSeries {
        self.filtered(|sample| sample.region == region)
    }

    pub fn by_instance_type(&self, instance_type: &str) -> PriceSeries {
        self.filtered(|sample| sample.instance_type == instance_type)
    }

    pub fn by_availability_zone(&self, zone: &str) -> PriceSeries {
        self.filtered(|sample| sample.availability_zone == zone)
    }

    /// Distinct zones in first-seen order.
    pub fn availability_zones(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.samples
            .iter()
            .filter(|sample| seen.insert(sample.availability_zone.as_str()))
            .map(|sample| sample.availability_zone.clone())
            .collect()
    }

    /// Group samples by the part of `ranges` that owns their timestamp. `ranges` is expected to
    /// be a partition such as [`Range::split`] produces, so a sample on a shared edge lands in
    /// exactly one bucket. Samples outside every part are left out.
    pub fn buckets(&self, ranges: &[Range]) -> Vec<PriceBucket> {
        let mut buckets: Vec<PriceBucket> = ranges
            .iter()
            .map(|range| PriceBucket {
                range: *range,
                prices: PriceSeries::new(),
            })
            .collect();

        for sample in &self.samples {
            if let Some(idx) = partition_index(ranges, sample.timestamp) {
                buckets[idx].prices.push(sample.clone());
            }
        }
        buckets
    }

    /// Copy of the series ordered by timestamp, ties kept in arrival order.
    pub fn sorted_by_time(&self) -> PriceSeries {
        let mut samples = self.samples.clone();
        samples.sort_by_key(|sample| sample.timestamp);
        PriceSeries { samples }
    }

    fn filtered<F>(&self, mut keep: F) -> PriceSeries
    where
        F: FnMut(&PriceSample) -> bool,
    {
        self.samples
            .iter()
            .filter(|sample| keep(sample))
            .cloned()
            .collect()
    }
}

impl FromIterator<PriceSample> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PriceSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl Extend<PriceSample> for PriceSeries {
    fn extend<I: IntoIterator<Item = PriceSample>>(&mut self, iter: I) {
        self.samples.extend(iter);
    }
}

impl IntoIterator for PriceSeries {
    type Item = PriceSample;
    type IntoIter = std::vec::IntoIter<PriceSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PriceSample;
    type IntoIter = std::slice::Iter<'a, PriceSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl fmt::Display for PriceSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min(), self.average()) {
            (Some(min), Some(avg)) => write!(
                f,
                "Price range ({} points): Min {:.5} Max {:.5} Avg {:.5}",
                self.len(),
                min,
                self.max(),
                avg
            ),
            _ => write!(f, "Price range (0 points)"),
        }
    }
}

/// Prices observed within one time range.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBucket {
    pub range: Range,
    pub prices: PriceSeries,
}

impl fmt::Display for PriceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {:.4} ({} prices)",
            self.range,
            self.prices.max(),
            self.prices.len()
        )
    }
}
