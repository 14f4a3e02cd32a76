#![allow(dead_code)]

use epistats::NetworkError;
use epistats::api::StatsSource;
use epistats::models::{
    CountryInfo, CountryStat, GlobalStat, HistoricalResponse, HistoricalTimeline,
    parse_timeline_date,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::mpsc::Receiver;

pub fn country(name: &str, iso2: &str, cases: u64, deaths: u64, population: u64) -> CountryStat {
    CountryStat {
        country: name.into(),
        country_info: CountryInfo {
            iso2: Some(iso2.into()),
            flag: Some(format!("https://flags.test/{}.png", iso2.to_lowercase())),
            ..CountryInfo::default()
        },
        continent: Some("Somewhere".into()),
        population: Some(population),
        updated: 1_700_000_000_000,
        cases: Some(cases),
        deaths: Some(deaths),
        ..CountryStat::default()
    }
}

/// Cumulative series from `(date, cases, deaths, recovered)` rows with `M/D/YY` dates.
pub fn timeline(rows: &[(&str, u64, u64, u64)]) -> HistoricalTimeline {
    let mut t = HistoricalTimeline::default();
    for (d, c, de, r) in rows {
        let date = parse_timeline_date(d).expect("valid test date");
        t.cases.insert(date, *c);
        t.deaths.insert(date, *de);
        t.recovered.insert(date, *r);
    }
    t
}

pub fn not_found(what: &str) -> NetworkError {
    NetworkError::Status {
        url: format!("https://fake.test/{}", what),
        status: 404,
        message: format!("{} not found", what),
    }
}

/// In-memory stand-in for the statistics API. Records every call.
#[derive(Default)]
pub struct FakeSource {
    pub countries: HashMap<String, CountryStat>,
    /// Historical series by request key (name or ISO-2 code).
    pub historical: HashMap<String, HistoricalTimeline>,
    /// Keys the API accepts but answers without a timeline.
    pub empty_historical: Vec<String>,
    pub fail_all_countries: bool,
    /// `fetch_country` for these names blocks until the receiver yields.
    pub gates: Mutex<HashMap<String, Receiver<()>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_countries(list: Vec<CountryStat>) -> Self {
        Self {
            countries: list.into_iter().map(|c| (c.country.clone(), c)).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl StatsSource for FakeSource {
    fn fetch_all_countries(&self) -> Result<Vec<CountryStat>, NetworkError> {
        self.record("all_countries".into());
        if self.fail_all_countries {
            return Err(NetworkError::Status {
                url: "https://fake.test/countries".into(),
                status: 503,
                message: "unavailable".into(),
            });
        }
        let sorted: BTreeMap<_, _> = self.countries.iter().collect();
        Ok(sorted.into_values().cloned().collect())
    }

    fn fetch_country(&self, name: &str) -> Result<CountryStat, NetworkError> {
        self.record(format!("country:{}", name));
        let gate = self.gates.lock().unwrap().remove(name);
        if let Some(rx) = gate {
            let _ = rx.recv();
        }
        self.countries
            .get(name)
            .or_else(|| {
                self.countries
                    .values()
                    .find(|c| c.iso2().is_some_and(|code| code.eq_ignore_ascii_case(name)))
            })
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    fn fetch_historical_raw(
        &self,
        key: &str,
        days: u32,
    ) -> Result<HistoricalResponse, NetworkError> {
        self.record(format!("historical:{}:{}", key, days));
        if let Some(t) = self.historical.get(key) {
            return Ok(HistoricalResponse {
                country: Some(key.into()),
                province: vec!["mainland".into()],
                timeline: Some(t.clone()),
            });
        }
        if self.empty_historical.iter().any(|k| k == key) {
            return Ok(HistoricalResponse::default());
        }
        Err(not_found(key))
    }

    fn fetch_global(&self) -> Result<GlobalStat, NetworkError> {
        self.record("global".into());
        Ok(GlobalStat {
            cases: Some(self.countries.values().filter_map(|c| c.cases).sum()),
            affected_countries: Some(self.countries.len() as u32),
            ..GlobalStat::default()
        })
    }
}

/// The five default comparison countries plus their timelines.
pub fn world() -> FakeSource {
    let mut src = FakeSource::with_countries(vec![
        country("USA", "US", 100_000_000, 1_100_000, 330_000_000),
        country("India", "IN", 44_000_000, 530_000, 1_400_000_000),
        country("Brazil", "BR", 37_000_000, 700_000, 215_000_000),
        country("Russia", "RU", 22_000_000, 390_000, 146_000_000),
        country("France", "FR", 39_000_000, 166_000, 65_000_000),
    ]);
    src.historical.insert(
        "USA".into(),
        timeline(&[("1/1/23", 100, 10, 0), ("1/2/23", 150, 12, 0)]),
    );
    src.historical.insert(
        "India".into(),
        timeline(&[("1/1/23", 40, 1, 5), ("1/2/23", 60, 2, 9)]),
    );
    src
}
