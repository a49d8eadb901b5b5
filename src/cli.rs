use std::path::PathBuf;

use clap::Parser;

use crate::error::{AppError, Result};
use crate::report::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "spot-history")]
#[command(about = "Fetch EC2 spot price history and estimate what spot capacity would have cost")]
#[command(version)]
pub struct Cli {
    /// How many days to go back
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Instance type, or several comma delimited
    #[arg(long, default_value = "c4.large")]
    pub instance: String,

    /// Product description to query (defaults to the configured product)
    #[arg(long)]
    pub product: Option<String>,

    /// Region, or several comma delimited
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Only include specific availability zones of the first region (e.g. a,b,c)
    #[arg(long, default_value = "")]
    pub azs: String,

    /// How many price-history requests to run at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Maximum bid to use in estimates, 0 for no cap
    #[arg(long, default_value_t = 0.0)]
    pub max_bid: f64,

    /// Hours covered by each price-history query
    #[arg(long)]
    pub chunk_hours: Option<u32>,

    /// JSON configuration file overlaying the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    pub fn regions(&self) -> Vec<String> {
        split_list(&self.region)
    }

    pub fn instance_types(&self) -> Vec<String> {
        split_list(&self.instance)
    }

    pub fn availability_zones(&self) -> Result<Vec<String>> {
        parse_availability_zones(&self.regions(), &self.azs)
    }

    pub fn max_bid(&self) -> Option<f64> {
        (self.max_bid > 0.0).then_some(self.max_bid)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand zone suffixes like `a,b` into full zone names of the first region.
pub fn parse_availability_zones(regions: &[String], suffixes: &str) -> Result<Vec<String>> {
    let suffixes = split_list(suffixes);
    if suffixes.is_empty() {
        return Ok(Vec::new());
    }

    let Some(region) = regions.first() else {
        return Err(AppError::invalid_request(
            "availability zones need at least one region",
        ));
    };

    Ok(suffixes
        .into_iter()
        .map(|suffix| format!("{region}{suffix}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_tool() {
        let cli = Cli::parse_from(["spot-history"]);

        assert_eq!(cli.days, 7);
        assert_eq!(cli.instance_types(), vec!["c4.large"]);
        assert_eq!(cli.regions(), vec!["us-east-1"]);
        assert!(cli.availability_zones().unwrap().is_empty());
        assert_eq!(cli.max_bid(), None);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parses_lists_and_overrides() {
        let cli = Cli::parse_from([
            "spot-history",
            "--instance",
            "c4.large, m5.large",
            "--region",
            "eu-west-1,us-west-2",
            "--azs",
            "a,c",
            "--concurrency",
            "4",
            "--max-bid",
            "0.05",
            "--chunk-hours",
            "2",
            "--format",
            "csv",
        ]);

        assert_eq!(cli.instance_types(), vec!["c4.large", "m5.large"]);
        assert_eq!(
            cli.availability_zones().unwrap(),
            vec!["eu-west-1a", "eu-west-1c"]
        );
        assert_eq!(cli.concurrency, Some(4));
        assert_eq!(cli.max_bid(), Some(0.05));
        assert_eq!(cli.chunk_hours, Some(2));
        assert_eq!(cli.format, OutputFormat::Csv);
    }

    #[test]
    fn zones_without_region_are_rejected() {
        assert!(parse_availability_zones(&[], "a").is_err());
        assert!(parse_availability_zones(&[], "").unwrap().is_empty());
    }
}
