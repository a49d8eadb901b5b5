use std::io::Write;

use clap::ValueEnum;
use unicode_width::UnicodeWidthStr;

use crate::error::{Context, Result};
use crate::instances;
use crate::prices::PriceSeries;
use crate::timerange::Range;

pub mod estimate;
pub mod histogram;

pub use estimate::CostEstimate;
pub use histogram::{format_price, Histogram, DEFAULT_BINS};

const LABEL_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Histograms and cost estimates per region and instance type
    #[default]
    Text,
    /// Every sample as CSV, sorted by timestamp
    Csv,
}

/// What the report covers.
#[derive(Debug, Clone)]
pub struct ReportScope<'a> {
    pub regions: &'a [String],
    pub instance_types: &'a [String],
    pub window: Range,
    pub days: u32,
    pub max_bid: Option<f64>,
}

pub fn write_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    prices: &PriceSeries,
    scope: &ReportScope<'_>,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(out, prices, scope),
        OutputFormat::Csv => write_csv(out, prices),
    }
}

/// One section per region and instance type: catalogue header, zone summary table,
/// histograms for all zones and each zone, then the cost estimate.
pub fn write_text<W: Write>(
    out: &mut W,
    prices: &PriceSeries,
    scope: &ReportScope<'_>,
) -> Result<()> {
    for region in scope.regions {
        for instance_type in scope.instance_types {
            let sliced = prices.by_region(region).by_instance_type(instance_type);
            let info = instances::lookup(region, instance_type);

            writeln!(out, "{}{}", labelled("Region:"), region)?;
            match &info {
                Some(info) => {
                    writeln!(
                        out,
                        "{}{} ({}, {} vCPU, {} GiB)",
                        labelled("Instance Type:"),
                        instance_type,
                        info.display_name,
                        info.vcpus,
                        info.memory_gib
                    )?;
                    writeln!(
                        out,
                        "{}${:.6}",
                        labelled("On-Demand Price:"),
                        info.on_demand_hourly
                    )?;
                }
                None => {
                    writeln!(out, "{}{}", labelled("Instance Type:"), instance_type)?;
                    writeln!(out, "{}unknown", labelled("On-Demand Price:"))?;
                }
            }
            writeln!(out, "{}", sliced)?;

            let zones = sliced.availability_zones();
            if !zones.is_empty() {
                writeln!(out)?;
                write!(out, "{}", zone_table(&sliced, &zones))?;
            }

            writeln!(out, "\nAll Availability Zones {}", zones.join(","))?;
            write!(out, "{}", histogram_of(&sliced))?;
            for zone in &zones {
                writeln!(out, "\nAvailability Zone {}", zone)?;
                write!(out, "{}", histogram_of(&sliced.by_availability_zone(zone)))?;
            }

            let on_demand = info.map(|info| info.on_demand_hourly).unwrap_or(0.0);
            let estimate =
                CostEstimate::compute(&scope.window, scope.days, on_demand, &sliced, scope.max_bid);
            writeln!(out, "\n{}\n", estimate)?;
        }
    }

    out.flush().context("Failed to flush report output")?;
    Ok(())
}

pub fn write_csv<W: Write>(out: W, prices: &PriceSeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for sample in prices.sorted_by_time().iter() {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}

fn labelled(label: &str) -> String {
    let pad = LABEL_WIDTH.saturating_sub(label.width());
    format!("{}{}", label, " ".repeat(pad))
}

fn histogram_of(prices: &PriceSeries) -> Histogram {
    let values: Vec<f64> = prices.iter().map(|sample| sample.price).collect();
    Histogram::new(&values, DEFAULT_BINS)
}

fn zone_table(prices: &PriceSeries, zones: &[String]) -> String {
    let headers = ["Zone", "Points", "Min", "Max", "Avg"];
    let rows: Vec<Vec<String>> = zones
        .iter()
        .map(|zone| {
            let zone_prices = prices.by_availability_zone(zone);
            vec![
                zone.clone(),
                zone_prices.len().to_string(),
                zone_prices.min().map(format_price).unwrap_or_default(),
                format_price(zone_prices.max()),
                zone_prices.average().map(format_price).unwrap_or_default(),
            ]
        })
        .collect();

    let all_rows: Vec<Vec<String>> =
        std::iter::once(headers.iter().map(|h| h.to_string()).collect())
            .chain(rows)
            .collect();

    let mut col_widths = vec![0; headers.len()];
    for row in &all_rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.width());
        }
    }

    let border = format!(
        "+{}+",
        col_widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut table = String::new();
    table.push_str(&border);
    table.push('\n');
    for (idx, row) in all_rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .zip(&col_widths)
            .map(|(cell, width)| format!(" {}{} ", cell, " ".repeat(width - cell.width())))
            .collect();
        table.push_str(&format!("|{}|\n", cells.join("|")));
        if idx == 0 {
            table.push_str(&border);
            table.push('\n');
        }
    }
    table.push_str(&border);
    table.push('\n');
    table
}
