use std::fmt;

use chrono::Duration;

use crate::prices::PriceSeries;
use crate::timerange::Range;

/// What running one instance continuously over the window would have cost,
/// on-demand versus bidding on spot every hour.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub days: u32,
    pub hours: usize,
    pub on_demand_hourly: f64,
    pub on_demand_total: f64,
    /// Bid placed every hour: the highest observed price, capped by the caller's maximum.
    pub bid: f64,
    pub spot_total: f64,
    pub hours_outbid: usize,
    pub hours_without_data: usize,
}

impl CostEstimate {
    /// `max_bid` of `None` bids the highest observed price. An hour counts as won when at least
    /// one zone's hourly high stays at or below the bid; a won hour costs that hour's overall high.
    pub fn compute(
        window: &Range,
        days: u32,
        on_demand_hourly: f64,
        prices: &PriceSeries,
        max_bid: Option<f64>,
    ) -> Self {
        let hours = window.split(Duration::hours(1));
        let bid = match max_bid {
            Some(cap) if cap > 0.0 => prices.max().min(cap),
            _ => prices.max(),
        };

        let mut spot_total = 0.0;
        let mut hours_outbid = 0;
        let mut hours_without_data = 0;

        for bucket in prices.buckets(&hours) {
            if bucket.prices.is_empty() {
                hours_without_data += 1;
                continue;
            }

            let won = bucket
                .prices
                .availability_zones()
                .iter()
                .any(|zone| bucket.prices.by_availability_zone(zone).max() <= bid);

            if won {
                spot_total += bucket.prices.max();
            } else {
                hours_outbid += 1;
            }
        }

        Self {
            days,
            hours: hours.len(),
            on_demand_hourly,
            on_demand_total: on_demand_hourly * hours.len() as f64,
            bid,
            spot_total,
            hours_outbid,
            hours_without_data,
        }
    }

    /// Percentage saved against on-demand, `None` when there is no on-demand price.
    pub fn savings_percent(&self) -> Option<f64> {
        if self.on_demand_total <= 0.0 {
            return None;
        }
        Some((self.on_demand_total - self.spot_total) / self.on_demand_total * 100.0)
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Time range is {} days, or {} hours",
            self.days, self.hours
        )?;
        writeln!(
            f,
            "At on-demand price of ${:.4} (across all azs): ${:.4}",
            self.on_demand_hourly, self.on_demand_total
        )?;
        match self.savings_percent() {
            Some(saved) => writeln!(
                f,
                "At maximum spot bid of ${:.4} (across all azs): ${:.4} ({:.2}% saved vs on-demand)",
                self.bid, self.spot_total, saved
            )?,
            None => writeln!(
                f,
                "At maximum spot bid of ${:.4} (across all azs): ${:.4}",
                self.bid, self.spot_total
            )?,
        }
        writeln!(f, "Hours outbid: {}", self.hours_outbid)?;
        write!(f, "Hours without price data: {}", self.hours_without_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::prices::PriceSample;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
    }

    fn sample(zone: &str, price: f64, minute: i64) -> PriceSample {
        PriceSample {
            region: "us-east-1".to_string(),
            instance_type: "c4.large".to_string(),
            availability_zone: zone.to_string(),
            price,
            timestamp: start() + Duration::minutes(minute),
        }
    }

    fn three_hours() -> Range {
        Range::new(start(), start() + Duration::hours(3)).unwrap()
    }

    #[test]
    fn uncapped_bid_wins_every_hour_with_data() {
        let prices: PriceSeries = vec![
            sample("us-east-1a", 0.03, 10),
            sample("us-east-1b", 0.05, 20),
            sample("us-east-1a", 0.04, 70),
        ]
        .into_iter()
        .collect();

        let estimate = CostEstimate::compute(&three_hours(), 1, 0.1, &prices, None);

        assert_eq!(estimate.hours, 3);
        assert!((estimate.bid - 0.05).abs() < 1e-12);
        assert!((estimate.spot_total - 0.09).abs() < 1e-12);
        assert_eq!(estimate.hours_outbid, 0);
        assert_eq!(estimate.hours_without_data, 1);
        assert!((estimate.on_demand_total - 0.3).abs() < 1e-12);
        assert!((estimate.savings_percent().unwrap() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn capped_bid_counts_outbid_hours() {
        let prices: PriceSeries = vec![
            sample("us-east-1a", 0.03, 10),
            sample("us-east-1b", 0.06, 20),
            sample("us-east-1a", 0.08, 70),
            sample("us-east-1b", 0.09, 75),
        ]
        .into_iter()
        .collect();

        let estimate = CostEstimate::compute(&three_hours(), 1, 0.1, &prices, Some(0.04));

        assert!((estimate.bid - 0.04).abs() < 1e-12);
        // First hour: zone a stays under the bid, the hour costs its overall high.
        assert!((estimate.spot_total - 0.06).abs() < 1e-12);
        assert_eq!(estimate.hours_outbid, 1);
    }

    #[test]
    fn zero_cap_means_no_cap() {
        let prices: PriceSeries = vec![sample("us-east-1a", 0.07, 5)].into_iter().collect();
        let estimate = CostEstimate::compute(&three_hours(), 1, 0.0, &prices, Some(0.0));

        assert!((estimate.bid - 0.07).abs() < 1e-12);
        assert_eq!(estimate.savings_percent(), None);
        assert!(estimate.to_string().contains("Hours outbid: 0"));
    }

    #[test]
    fn sample_on_an_hour_boundary_is_paid_once() {
        let window = Range::new(start(), start() + Duration::hours(2)).unwrap();
        let prices: PriceSeries = vec![sample("us-east-1a", 0.05, 60)].into_iter().collect();

        let estimate = CostEstimate::compute(&window, 1, 0.1, &prices, None);

        assert!((estimate.spot_total - 0.05).abs() < 1e-12);
        assert_eq!(estimate.hours_without_data, 1);
        assert_eq!(estimate.hours_outbid, 0);
    }
}
