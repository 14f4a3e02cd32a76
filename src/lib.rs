//! epistats
//!
//! The data layer of a COVID-19 statistics dashboard: a typed client for the
//! public disease.sh API, pure transformations (per-million figures, daily
//! deltas, ranking, number formatting) and a state container with named
//! actions that a front end drives. Pairs with the `epistats` CLI.
//!
//! ### Features
//! - Fetch all countries, one country, world totals and historical series
//! - Resolve historical series by ISO-2 code when the name is not indexed
//! - Fetch comparison sets concurrently, all-or-nothing
//! - Derive daily figures from cumulative series, clamped at zero
//! - Keep overlapping selections from overwriting each other
//!
//! ### Example
//! ```no_run
//! use epistats::{Client, Dashboard};
//!
//! let dashboard = Dashboard::new(Client::new()?);
//! dashboard.initialize();
//! let state = dashboard.snapshot();
//! if let Some(err) = &state.error {
//!     eprintln!("{}", err);
//! }
//! for point in dashboard.daily_deltas() {
//!     println!("{} {}", point.date, epistats::transform::format_number(Some(point.cases as f64)));
//! }
//! # Ok::<(), epistats::NetworkError>(())
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod search;
pub mod stats;
pub mod store;
pub mod transform;

pub use api::{Client, ClientConfig, StatsSource};
pub use error::NetworkError;
pub use models::{ChartType, CountryStat, DailyDeltaPoint, HistoricalTimeline, Metric};
pub use store::{Action, AppState, Dashboard, DashboardConfig};
