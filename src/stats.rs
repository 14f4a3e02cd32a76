use crate::models::{CountryStat, Metric};
use crate::transform::per_million;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One country in a side-by-side comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRow {
    pub country: String,
    /// What is charted: per-million when requested and the population is known.
    pub value: f64,
    /// The metric as reported.
    pub raw_value: f64,
    pub population: Option<u64>,
    pub continent: Option<String>,
    pub flag: Option<String>,
}

/// Headline figures over a comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonSummary {
    pub metric: Metric,
    pub count: usize,
    pub highest: ComparisonRow,
    pub lowest: ComparisonRow,
    /// Mean of the charted values.
    pub mean: f64,
    /// Sum of the raw values.
    pub total: f64,
}

/// Rows for a comparison chart, highest value first.
///
/// With `per_million`, each value is rescaled by the country's population;
/// countries without a population keep their raw value. Metrics that are
/// already per-million are never rescaled twice.
pub fn comparison_rows(data: &[CountryStat], metric: Metric, per_million_view: bool) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = data
        .iter()
        .map(|c| {
            let raw = c.value(metric).unwrap_or(0.0);
            let value = if per_million_view && !metric.is_per_million() {
                per_million(raw, c.population).map(|v| v as f64).unwrap_or(raw)
            } else {
                raw
            };
            ComparisonRow {
                country: c.country.clone(),
                value,
                raw_value: raw,
                population: c.population,
                continent: c.continent.clone(),
                flag: c.flag().map(String::from),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    rows
}

/// Highest, lowest, mean and total over rows from [`comparison_rows`].
/// `None` for an empty comparison.
pub fn summarize(metric: Metric, rows: &[ComparisonRow]) -> Option<ComparisonSummary> {
    let highest = rows
        .iter()
        .max_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal))?;
    let lowest = rows
        .iter()
        .min_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal))?;
    let count = rows.len();
    let mean = rows.iter().map(|r| r.value).sum::<f64>() / count as f64;
    let total = rows.iter().map(|r| r.raw_value).sum::<f64>();
    Some(ComparisonSummary {
        metric,
        count,
        highest: highest.clone(),
        lowest: lowest.clone(),
        mean,
        total,
    })
}
