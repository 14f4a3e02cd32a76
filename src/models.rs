use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Country metadata nested in every country record (`countryInfo`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryInfo {
    #[serde(rename = "_id", default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub iso2: Option<String>,
    #[serde(default)]
    pub iso3: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub long: Option<f64>,
    #[serde(default)]
    pub flag: Option<String>,
}

/// Snapshot of one country's cumulative metrics, as returned by `/countries`.
///
/// Counts are optional because the API reports `null` for some countries
/// (e.g. `critical` or `tests` where no figures are published).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStat {
    pub country: String,
    #[serde(default)]
    pub country_info: CountryInfo,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub population: Option<u64>,
    /// Epoch milliseconds of the upstream refresh.
    #[serde(default)]
    pub updated: i64,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub cases: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub today_cases: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub deaths: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub today_deaths: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub recovered: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub today_recovered: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub active: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub critical: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub tests: Option<u64>,
    #[serde(default)]
    pub cases_per_one_million: Option<f64>,
    #[serde(default)]
    pub deaths_per_one_million: Option<f64>,
    #[serde(default)]
    pub tests_per_one_million: Option<f64>,
}

impl CountryStat {
    /// Numeric value of `metric`, `None` when the API did not report it.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        let count = |v: Option<u64>| v.map(|n| n as f64);
        match metric {
            Metric::Cases => count(self.cases),
            Metric::TodayCases => count(self.today_cases),
            Metric::Deaths => count(self.deaths),
            Metric::TodayDeaths => count(self.today_deaths),
            Metric::Recovered => count(self.recovered),
            Metric::TodayRecovered => count(self.today_recovered),
            Metric::Active => count(self.active),
            Metric::Critical => count(self.critical),
            Metric::Tests => count(self.tests),
            Metric::Population => count(self.population),
            Metric::CasesPerOneMillion => self.cases_per_one_million,
            Metric::DeathsPerOneMillion => self.deaths_per_one_million,
            Metric::TestsPerOneMillion => self.tests_per_one_million,
        }
    }

    pub fn iso2(&self) -> Option<&str> {
        self.country_info
            .iso2
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn flag(&self) -> Option<&str> {
        self.country_info.flag.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated)
    }
}

/// World totals from `/all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStat {
    #[serde(default)]
    pub updated: i64,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub cases: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub today_cases: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub deaths: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub today_deaths: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub recovered: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub active: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub critical: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub tests: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub population: Option<u64>,
    #[serde(default)]
    pub affected_countries: Option<u32>,
}

impl GlobalStat {
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated)
    }
}

/// Cumulative series keyed by calendar date, ascending.
pub type DateSeries = BTreeMap<NaiveDate, u64>;

/// Three parallel cumulative series for one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTimeline {
    #[serde(default, deserialize_with = "de_date_series")]
    pub cases: DateSeries,
    #[serde(default, deserialize_with = "de_date_series")]
    pub deaths: DateSeries,
    /// Often empty upstream; missing dates read as 0.
    #[serde(default, deserialize_with = "de_date_series")]
    pub recovered: DateSeries,
}

impl HistoricalTimeline {
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }
}

/// Raw body of `/historical/{key}`. `timeline` is absent when the API
/// accepted the key but has no series for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalResponse {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "de_province")]
    pub province: Vec<String>,
    #[serde(default)]
    pub timeline: Option<HistoricalTimeline>,
}

impl HistoricalResponse {
    /// The timeline, if present and non-empty.
    pub fn into_timeline(self) -> Option<HistoricalTimeline> {
        self.timeline.filter(|t| !t.is_empty())
    }
}

/// One day of derived (non-cumulative) figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDeltaPoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub active: u64,
}

/// Metric a view is ranked or charted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[default]
    Cases,
    TodayCases,
    Deaths,
    TodayDeaths,
    Recovered,
    TodayRecovered,
    Active,
    Critical,
    Tests,
    Population,
    CasesPerOneMillion,
    DeathsPerOneMillion,
    TestsPerOneMillion,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::Cases,
        Metric::TodayCases,
        Metric::Deaths,
        Metric::TodayDeaths,
        Metric::Recovered,
        Metric::TodayRecovered,
        Metric::Active,
        Metric::Critical,
        Metric::Tests,
        Metric::Population,
        Metric::CasesPerOneMillion,
        Metric::DeathsPerOneMillion,
        Metric::TestsPerOneMillion,
    ];

    /// Field name as used by the API.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::TodayCases => "todayCases",
            Metric::Deaths => "deaths",
            Metric::TodayDeaths => "todayDeaths",
            Metric::Recovered => "recovered",
            Metric::TodayRecovered => "todayRecovered",
            Metric::Active => "active",
            Metric::Critical => "critical",
            Metric::Tests => "tests",
            Metric::Population => "population",
            Metric::CasesPerOneMillion => "casesPerOneMillion",
            Metric::DeathsPerOneMillion => "deathsPerOneMillion",
            Metric::TestsPerOneMillion => "testsPerOneMillion",
        }
    }

    /// Human label for headings.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cases => "Total Cases",
            Metric::TodayCases => "Today's Cases",
            Metric::Deaths => "Total Deaths",
            Metric::TodayDeaths => "Today's Deaths",
            Metric::Recovered => "Total Recovered",
            Metric::TodayRecovered => "Today's Recovered",
            Metric::Active => "Active Cases",
            Metric::Critical => "Critical Cases",
            Metric::Tests => "Total Tests",
            Metric::Population => "Population",
            Metric::CasesPerOneMillion => "Cases per Million",
            Metric::DeathsPerOneMillion => "Deaths per Million",
            Metric::TestsPerOneMillion => "Tests per Million",
        }
    }

    /// Already normalised by population; per-million display must not rescale it.
    pub fn is_per_million(&self) -> bool {
        matches!(
            self,
            Metric::CasesPerOneMillion | Metric::DeathsPerOneMillion | Metric::TestsPerOneMillion
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts the API key (`todayCases`) case-insensitively, with `-`/`_` ignored,
    /// so `today-cases` and `TODAY_CASES` work too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.key().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown metric: {}", s))
    }
}

/// How the comparison view is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Table,
}

/// Serde helper: counts arrive as integers, occasionally as floats or `null`.
fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a non-negative number or null")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(Some)
                .map_err(|_| E::custom("negative count"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v < 0.0 {
                return Err(E::custom("count must be a finite non-negative number"));
            }
            Ok(Some(v.round() as u64))
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

/// Parse the API's date keys. Upstream uses `M/D/YY`; ISO dates are accepted too.
pub fn parse_timeline_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Serde helper: `{ "1/22/20": 1, ... }` into a chronologically ordered map.
///
/// A plain JSON object comes back in lexical key order ("10/1/20" < "9/30/20"),
/// so the keys must be parsed before ordering means anything.
fn de_date_series<'de, D>(deserializer: D) -> Result<DateSeries, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<HashMap<String, Option<u64>>> = Option::deserialize(deserializer)?;
    let mut out = DateSeries::new();
    for (key, value) in raw.unwrap_or_default() {
        let date = parse_timeline_date(&key)
            .ok_or_else(|| D::Error::custom(format!("invalid timeline date: {}", key)))?;
        out.insert(date, value.unwrap_or(0));
    }
    Ok(out)
}

/// Serde helper: `province` is `null`, a string, or a list of strings.
fn de_province<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<Option<String>>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(p)) => vec![p],
        Some(OneOrMany::Many(ps)) => ps.into_iter().flatten().collect(),
    })
}
