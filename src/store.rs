//! Application state and the actions that change it.
//!
//! [`AppState`] is plain data. It only changes through [`AppState::apply`],
//! which matches exhaustively over the closed [`Action`] enum. [`Dashboard`]
//! owns one `AppState` behind a mutex together with a [`StatsSource`], and
//! exposes the named actions (fetch, select, toggle...) that a front end calls.
//!
//! Network failures stop here: every action catches them, logs the detail and
//! stores a readable message in [`AppState::error`].
//!
//! ### Overlapping calls
//! Each asynchronous action belongs to a target (all countries, selection,
//! comparison) with its own generation counter. Starting an action bumps the
//! counter; its results are applied only while that generation is still the
//! latest. A slow `select_country("USA")` that finishes after a later
//! `select_country("India")` is therefore dropped instead of overwriting
//! India's data.
use crate::api::StatsSource;
use crate::models::{ChartType, CountryStat, DailyDeltaPoint, HistoricalTimeline, Metric};
use crate::search::Debouncer;
use crate::stats::{self, ComparisonRow, ComparisonSummary};
use crate::transform;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Knobs for a [`Dashboard`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Selected automatically after the first successful country load.
    pub default_country: String,
    pub comparison_countries: Vec<String>,
    /// Days of history requested for the selected country.
    pub history_days: u32,
    /// Refetch comparison data when the selected metric changes. The fetched
    /// countries do not depend on the metric, so this only refreshes figures.
    pub refetch_comparison_on_metric_change: bool,
    pub search_quiet_period: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_country: "USA".into(),
            comparison_countries: ["USA", "India", "Brazil", "Russia", "France"]
                .into_iter()
                .map(String::from)
                .collect(),
            history_days: 30,
            refetch_comparison_on_metric_change: true,
            search_quiet_period: Duration::from_millis(300),
        }
    }
}

/// Everything a view renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub countries: Vec<CountryStat>,
    pub selected_country: Option<String>,
    pub selected_country_data: Option<CountryStat>,
    pub historical: Option<HistoricalTimeline>,
    pub comparison_countries: Vec<String>,
    pub comparison_data: Vec<CountryStat>,
    pub loading: bool,
    pub error: Option<String>,
    pub selected_metric: Metric,
    pub search_term: String,
    pub show_per_million: bool,
    pub chart_type: ChartType,
}

impl AppState {
    pub fn new(comparison_countries: Vec<String>) -> Self {
        Self {
            countries: Vec::new(),
            selected_country: None,
            selected_country_data: None,
            historical: None,
            comparison_countries,
            comparison_data: Vec::new(),
            loading: false,
            error: None,
            selected_metric: Metric::Cases,
            search_term: String::new(),
            show_per_million: false,
            chart_type: ChartType::Bar,
        }
    }

    /// Apply one transition.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetLoading(loading) => self.loading = loading,
            Action::SetError(message) => self.error = Some(message),
            Action::ClearError => self.error = None,
            Action::SetCountries(countries) => self.countries = countries,
            Action::SetSelectedCountry(name) => self.selected_country = Some(name),
            Action::SetSelectedCountryData(data) => self.selected_country_data = Some(data),
            Action::SetHistoricalData(timeline) => self.historical = Some(timeline),
            Action::SetComparisonCountries(names) => self.comparison_countries = names,
            Action::SetComparisonData(data) => self.comparison_data = data,
            Action::SetSelectedMetric(metric) => self.selected_metric = metric,
            Action::SetSearchTerm(term) => self.search_term = term,
            Action::TogglePerMillion => self.show_per_million = !self.show_per_million,
            Action::SetChartType(chart_type) => self.chart_type = chart_type,
            Action::Reset { comparison_countries } => *self = AppState::new(comparison_countries),
        }
    }
}

/// Every way [`AppState`] can change.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLoading(bool),
    SetError(String),
    ClearError,
    SetCountries(Vec<CountryStat>),
    SetSelectedCountry(String),
    SetSelectedCountryData(CountryStat),
    SetHistoricalData(HistoricalTimeline),
    SetComparisonCountries(Vec<String>),
    SetComparisonData(Vec<CountryStat>),
    SetSelectedMetric(Metric),
    SetSearchTerm(String),
    TogglePerMillion,
    SetChartType(ChartType),
    /// Back to the start-up state.
    Reset { comparison_countries: Vec<String> },
}

pub const COUNTRIES_ERROR: &str = "Failed to fetch countries data";
pub const COMPARISON_ERROR: &str = "Failed to fetch comparison data";

pub fn country_error(name: &str) -> String {
    format!("Failed to fetch data for {}", name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Countries = 0,
    Selection = 1,
    Comparison = 2,
}

struct Inner {
    state: AppState,
    in_flight: usize,
    generations: [u64; 3],
}

impl Inner {
    fn bump(&mut self, target: Target) -> u64 {
        let g = &mut self.generations[target as usize];
        *g += 1;
        *g
    }

    fn is_current(&self, target: Target, generation: u64) -> bool {
        self.generations[target as usize] == generation
    }
}

/// Keeps `loading` raised while an action is running; lowers it on every exit path.
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut g = lock(self.inner);
        g.in_flight = g.in_flight.saturating_sub(1);
        let busy = g.in_flight > 0;
        g.state.apply(Action::SetLoading(busy));
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // State stays usable even if a caller panicked mid-update; every action
    // leaves it in a valid state between lock acquisitions.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State container wired to a data source.
///
/// Share it as `Arc<Dashboard<_>>` when actions run from several threads.
pub struct Dashboard<S> {
    source: S,
    config: DashboardConfig,
    inner: Mutex<Inner>,
}

impl<S: StatsSource + Sync> Dashboard<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, DashboardConfig::default())
    }

    pub fn with_config(source: S, config: DashboardConfig) -> Self {
        let state = AppState::new(config.comparison_countries.clone());
        Self {
            source,
            config,
            inner: Mutex::new(Inner {
                state,
                in_flight: 0,
                generations: [0; 3],
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn dispatch(&self, action: Action) {
        lock(&self.inner).state.apply(action);
    }

    /// Open a new generation for `target`, raise loading and apply `actions`,
    /// all under one lock.
    fn start(
        &self,
        target: Target,
        actions: impl IntoIterator<Item = Action>,
    ) -> (u64, InFlight<'_>) {
        let mut g = lock(&self.inner);
        let generation = g.bump(target);
        g.in_flight += 1;
        g.state.apply(Action::SetLoading(true));
        for action in actions {
            g.state.apply(action);
        }
        (generation, InFlight { inner: &self.inner })
    }

    /// Apply `actions` if `generation` is still the latest for `target`.
    fn commit(
        &self,
        target: Target,
        generation: u64,
        actions: impl IntoIterator<Item = Action>,
    ) -> bool {
        let mut g = lock(&self.inner);
        if !g.is_current(target, generation) {
            debug!("dropping stale {:?} result (generation {})", target, generation);
            return false;
        }
        for action in actions {
            g.state.apply(action);
        }
        true
    }

    /// Mount: load every country (selecting the default one), then the comparison set.
    pub fn initialize(&self) {
        self.fetch_countries();
        self.fetch_comparison_data();
    }

    /// Retry from scratch: discard the whole state and initialise again.
    /// Results of calls started before the reload are ignored.
    pub fn reload(&self) {
        {
            let mut g = lock(&self.inner);
            for target in [Target::Countries, Target::Selection, Target::Comparison] {
                g.bump(target);
            }
            let busy = g.in_flight > 0;
            g.state.apply(Action::Reset {
                comparison_countries: self.config.comparison_countries.clone(),
            });
            g.state.apply(Action::SetLoading(busy));
        }
        self.initialize();
    }

    /// Load the full country list. On the first success with nothing selected,
    /// selects [`DashboardConfig::default_country`].
    pub fn fetch_countries(&self) {
        let (generation, _loading) = self.start(Target::Countries, []);
        match self.source.fetch_all_countries() {
            Ok(countries) => {
                let select_default = {
                    let mut g = lock(&self.inner);
                    if !g.is_current(Target::Countries, generation) {
                        debug!("dropping stale country list (generation {})", generation);
                        return;
                    }
                    let any = !countries.is_empty();
                    g.state.apply(Action::SetCountries(countries));
                    any && g.state.selected_country.is_none()
                };
                if select_default {
                    self.select_country(&self.config.default_country);
                }
            }
            Err(e) => {
                warn!("loading countries failed: {}", e);
                self.commit(
                    Target::Countries,
                    generation,
                    [Action::SetError(COUNTRIES_ERROR.into())],
                );
            }
        }
    }

    /// Select `name` and load its detail record, then its history.
    ///
    /// The name is set immediately. On failure the previous detail and
    /// history stay in place and the error is set.
    pub fn select_country(&self, name: &str) {
        let (generation, _loading) = self.start(
            Target::Selection,
            [Action::SetSelectedCountry(name.to_string())],
        );

        let detail = match self.source.fetch_country(name) {
            Ok(detail) => detail,
            Err(e) => {
                warn!("loading {} failed: {}", name, e);
                self.commit(
                    Target::Selection,
                    generation,
                    [Action::SetError(country_error(name))],
                );
                return;
            }
        };
        if !self.commit(
            Target::Selection,
            generation,
            [Action::SetSelectedCountryData(detail)],
        ) {
            return;
        }

        match self.source.fetch_historical(name, self.config.history_days) {
            Ok(timeline) => {
                self.commit(
                    Target::Selection,
                    generation,
                    [Action::SetHistoricalData(timeline)],
                );
            }
            Err(e) => {
                warn!("loading history for {} failed: {}", name, e);
                self.commit(
                    Target::Selection,
                    generation,
                    [Action::SetError(country_error(name))],
                );
            }
        }
    }

    /// Fetch every country of the comparison set concurrently and replace the
    /// comparison data. On failure the previous data is kept.
    pub fn fetch_comparison_data(&self) {
        let (generation, _loading) = self.start(Target::Comparison, []);
        let names = lock(&self.inner).state.comparison_countries.clone();
        match self.source.fetch_countries(&names) {
            Ok(data) => {
                self.commit(
                    Target::Comparison,
                    generation,
                    [Action::SetComparisonData(data)],
                );
            }
            Err(e) => {
                warn!("loading comparison data failed: {}", e);
                self.commit(
                    Target::Comparison,
                    generation,
                    [Action::SetError(COMPARISON_ERROR.into())],
                );
            }
        }
    }

    /// Replace the comparison set; refetches when it changed and is non-empty.
    pub fn set_comparison_countries(&self, names: Vec<String>) {
        let refetch = {
            let mut g = lock(&self.inner);
            let changed = g.state.comparison_countries != names;
            g.state.apply(Action::SetComparisonCountries(names));
            changed && !g.state.comparison_countries.is_empty()
        };
        if refetch {
            self.fetch_comparison_data();
        }
    }

    /// Change the metric; refetches comparison data when it changed (see
    /// [`DashboardConfig::refetch_comparison_on_metric_change`]).
    pub fn set_selected_metric(&self, metric: Metric) {
        let refetch = {
            let mut g = lock(&self.inner);
            let changed = g.state.selected_metric != metric;
            g.state.apply(Action::SetSelectedMetric(metric));
            changed
                && self.config.refetch_comparison_on_metric_change
                && !g.state.comparison_countries.is_empty()
        };
        if refetch {
            self.fetch_comparison_data();
        }
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.dispatch(Action::SetSearchTerm(term.into()));
    }

    pub fn toggle_per_million(&self) {
        self.dispatch(Action::TogglePerMillion);
    }

    pub fn set_chart_type(&self, chart_type: ChartType) {
        self.dispatch(Action::SetChartType(chart_type));
    }

    pub fn clear_error(&self) {
        self.dispatch(Action::ClearError);
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AppState {
        lock(&self.inner).state.clone()
    }

    /// Borrow the state for the duration of `f` without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&lock(&self.inner).state)
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(|s| s.loading)
    }

    pub fn has_error(&self) -> bool {
        self.with_state(|s| s.error.is_some())
    }

    pub fn error(&self) -> Option<String> {
        self.with_state(|s| s.error.clone())
    }

    /// Countries matching the current search term.
    pub fn filtered_countries(&self) -> Vec<CountryStat> {
        self.with_state(|s| {
            transform::filter_by_search(&s.countries, &s.search_term)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Comparison rows for the selected metric and per-million toggle.
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        self.with_state(|s| {
            stats::comparison_rows(&s.comparison_data, s.selected_metric, s.show_per_million)
        })
    }

    pub fn comparison_summary(&self) -> Option<ComparisonSummary> {
        let metric = self.with_state(|s| s.selected_metric);
        stats::summarize(metric, &self.comparison_rows())
    }

    /// Daily figures for the selected country's history; empty before it loads.
    pub fn daily_deltas(&self) -> Vec<DailyDeltaPoint> {
        self.with_state(|s| {
            s.historical
                .as_ref()
                .map(transform::to_daily_deltas)
                .unwrap_or_default()
        })
    }
}

impl<S: StatsSource + Send + Sync + 'static> Dashboard<S> {
    /// A debouncer that feeds settled input into [`Dashboard::set_search_term`].
    /// Holds only a weak handle, so it does not keep the dashboard alive.
    pub fn search_debouncer(self: &Arc<Self>) -> Debouncer {
        let weak = Arc::downgrade(self);
        Debouncer::spawn(self.config.search_quiet_period, move |term| {
            if let Some(dashboard) = weak.upgrade() {
                dashboard.set_search_term(term);
            }
        })
    }
}
