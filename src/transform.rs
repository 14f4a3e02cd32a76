//! Pure helpers: number formatting, per-million normalisation, daily deltas, ranking.
//!
//! Nothing in here does I/O or keeps state; every function is safe to call
//! repeatedly on the same input.
use crate::models::{CountryStat, DailyDeltaPoint, DateSeries, HistoricalTimeline, Metric};
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Shown wherever a figure is unknown or cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Map a user-provided locale tag to a `num_format::Locale`.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> &'static Locale {
    match tag.to_lowercase().replace('-', "_").as_str() {
        "de" | "de_de" | "german" => &Locale::de,
        "fr" | "fr_fr" => &Locale::fr,
        "es" | "es_es" => &Locale::es,
        "it" | "it_it" => &Locale::it,
        "pt" | "pt_pt" | "pt_br" => &Locale::pt,
        "nl" | "nl_nl" => &Locale::nl,
        _ => &Locale::en,
    }
}

/// Thousands-grouped integer (`1,234,567`), or `"N/A"` for a missing value.
/// Fractions are rounded to the nearest integer.
pub fn format_number(n: Option<f64>) -> String {
    format_number_locale(n, "en")
}

/// Same as [`format_number`] with the grouping of `locale_tag` (e.g. `"de"` gives `1.234.567`).
pub fn format_number_locale(n: Option<f64>, locale_tag: &str) -> String {
    match n {
        Some(v) if v.is_finite() => (v.round() as i64).to_formatted_string(map_locale(locale_tag)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// `value` rescaled to "per 1,000,000 population", rounded.
/// `None` when the population is zero or unknown.
pub fn per_million(value: f64, population: Option<u64>) -> Option<i64> {
    match population {
        Some(p) if p > 0 => Some((value / p as f64 * 1_000_000.0).round() as i64),
        _ => None,
    }
}

/// Display form of [`per_million`]: grouped number or `"N/A"`.
pub fn format_per_million(value: f64, population: Option<u64>) -> String {
    format_number(per_million(value, population).map(|v| v as f64))
}

/// `part / whole * 100`, rounded to two decimals; 0 when `whole` is zero or unknown.
pub fn calculate_percentage(part: f64, whole: Option<f64>) -> f64 {
    match whole {
        Some(w) if w != 0.0 && w.is_finite() => ((part / w) * 100.0 * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

/// Convert cumulative series into one point per date of `timeline.cases`.
///
/// The first point carries the cumulative values themselves. Later points
/// are day-over-day differences floored at zero: upstream occasionally
/// revises totals downward and a negative "new cases" figure is noise.
/// `active` is derived from the unclamped differences of the same day.
pub fn to_daily_deltas(timeline: &HistoricalTimeline) -> Vec<DailyDeltaPoint> {
    let at = |series: &DateSeries, date: &NaiveDate| series.get(date).copied().unwrap_or(0) as i128;

    let mut out = Vec::with_capacity(timeline.cases.len());
    let mut prev: Option<(i128, i128, i128)> = None;
    for date in timeline.cases.keys() {
        let current = (
            at(&timeline.cases, date),
            at(&timeline.deaths, date),
            at(&timeline.recovered, date),
        );
        let (dc, dd, dr) = match prev {
            None => current,
            Some(p) => (current.0 - p.0, current.1 - p.1, current.2 - p.2),
        };
        let floor = |v: i128| v.max(0) as u64;
        out.push(DailyDeltaPoint {
            date: *date,
            cases: floor(dc),
            deaths: floor(dd),
            recovered: floor(dr),
            active: floor(dc - dd - dr),
        });
        prev = Some(current);
    }
    out
}

/// Copy of `countries` ordered by `metric` (descending unless `ascending`).
/// Unknown values rank as 0. The input is left untouched.
pub fn sort_by_metric(countries: &[CountryStat], metric: Metric, ascending: bool) -> Vec<CountryStat> {
    let mut out = countries.to_vec();
    out.sort_by(|a, b| {
        let av = a.value(metric).unwrap_or(0.0);
        let bv = b.value(metric).unwrap_or(0.0);
        let ord = av.partial_cmp(&bv).unwrap_or(Ordering::Equal);
        if ascending { ord } else { ord.reverse() }
    });
    out
}

/// Countries whose name contains `term`, ignoring case. An empty term matches all.
pub fn filter_by_search<'a>(countries: &'a [CountryStat], term: &str) -> Vec<&'a CountryStat> {
    let needle = term.trim().to_lowercase();
    countries
        .iter()
        .filter(|c| needle.is_empty() || c.country.to_lowercase().contains(&needle))
        .collect()
}
