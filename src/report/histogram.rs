use std::fmt;

use unicode_width::UnicodeWidthStr;

/// Bin count used by the text report.
pub const DEFAULT_BINS: usize = 3;
/// Widest bar in columns.
pub const DEFAULT_BAR_WIDTH: usize = 40;

const BAR: &str = "█";

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub low: f64,
    pub high: f64,
    pub count: usize,
}

/// Equal-width price bins spanning the observed minimum to maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: Vec<Bin>,
    total: usize,
    bar_width: usize,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Self {
        let bin_count = bins.max(1);
        let total = values.len();
        let Some((min, max)) = bounds(values) else {
            return Self {
                bins: Vec::new(),
                total,
                bar_width: DEFAULT_BAR_WIDTH,
            };
        };

        // A flat series collapses into a single bin.
        if max <= min {
            return Self {
                bins: vec![Bin {
                    low: min,
                    high: max,
                    count: total,
                }],
                total,
                bar_width: DEFAULT_BAR_WIDTH,
            };
        }

        let step = (max - min) / bin_count as f64;
        let mut counts = vec![0usize; bin_count];
        for value in values {
            let idx = (((value - min) / step) as usize).min(bin_count - 1);
            counts[idx] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(idx, count)| Bin {
                low: min + step * idx as f64,
                high: if idx + 1 == bin_count {
                    max
                } else {
                    min + step * (idx + 1) as f64
                },
                count,
            })
            .collect();

        Self {
            bins,
            total,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bins.is_empty() {
            return writeln!(f, "(no prices)");
        }

        let labels: Vec<String> = self
            .bins
            .iter()
            .map(|bin| format!("{}-{}", format_price(bin.low), format_price(bin.high)))
            .collect();
        let label_width = labels.iter().map(|label| label.width()).max().unwrap_or(0);
        let peak = self.bins.iter().map(|bin| bin.count).max().unwrap_or(0);

        for (bin, label) in self.bins.iter().zip(&labels) {
            let share = if self.total == 0 {
                0.0
            } else {
                bin.count as f64 * 100.0 / self.total as f64
            };
            let bar_len = if peak == 0 {
                0
            } else {
                bin.count * self.bar_width / peak
            };
            let bar = BAR.repeat(bar_len);

            writeln!(
                f,
                "{}{}  {:>6.2}%  {}{} {}",
                label,
                " ".repeat(label_width - label.width()),
                share,
                bar,
                " ".repeat(self.bar_width - bar_len),
                bin.count
            )?;
        }
        Ok(())
    }
}

/// Price with up to six decimals and no trailing zeros.
pub fn format_price(value: f64) -> String {
    let text = format!("{:.6}", value);
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), value| {
        (lo.min(value), hi.max(value))
    }))
}
