//! Live API tests. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use epistats::api::StatsSource;
use epistats::models::Metric;
use epistats::transform::sort_by_metric;
use epistats::{Client, Dashboard};

#[test]
fn fetch_all_countries_and_rank() {
    let cli = Client::new().unwrap();
    let all = cli.fetch_all_countries().unwrap();
    assert!(all.len() > 100);
    let ranked = sort_by_metric(&all, Metric::Cases, false);
    assert!(ranked[0].cases >= ranked[1].cases);
}

#[test]
fn fetch_country_by_name_and_code() {
    let cli = Client::new().unwrap();
    let by_name = cli.fetch_country("Germany").unwrap();
    let by_code = cli.fetch_country("DE").unwrap();
    assert_eq!(by_name.country, by_code.country);
    assert_eq!(by_name.iso2(), Some("DE"));
}

#[test]
fn fetch_historical_window() {
    let cli = Client::new().unwrap();
    let t = cli.fetch_historical("USA", 10).unwrap();
    assert_eq!(t.cases.len(), 10);
    let weekly = cli.fetch_weekly_trends("France").unwrap();
    assert_eq!(weekly.cases.len(), 7);
}

#[test]
fn unknown_country_is_an_error() {
    let cli = Client::new().unwrap();
    assert!(cli.fetch_country("Atlantis").unwrap_err().is_not_found());
}

#[test]
fn dashboard_initializes_against_live_api() {
    let dashboard = Dashboard::new(Client::new().unwrap());
    dashboard.initialize();
    let s = dashboard.snapshot();
    assert!(s.error.is_none(), "{:?}", s.error);
    assert_eq!(s.selected_country.as_deref(), Some("USA"));
    assert_eq!(s.comparison_data.len(), 5);
    assert!(!dashboard.daily_deltas().is_empty());
}
