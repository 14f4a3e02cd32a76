//! Blocking client for the **disease.sh** COVID-19 statistics API (v3).
//!
//! The store never talks to HTTP directly; it goes through [`StatsSource`],
//! which [`Client`] implements. The resolution policies (ISO-2 fallback for
//! historical series, all-or-nothing batches) live in the trait's provided
//! methods so every source, including test fakes, behaves the same.
//!
//! Typical usage:
//! ```no_run
//! # use epistats::api::{Client, StatsSource};
//! let client = Client::new()?;
//! let usa = client.fetch_country("USA")?;
//! let timeline = client.fetch_historical("USA", 30)?;
//! # Ok::<(), epistats::NetworkError>(())
//! ```
use crate::error::NetworkError;
use crate::models::{CountryStat, GlobalStat, HistoricalResponse, HistoricalTimeline};
use log::{debug, error, info, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://disease.sh/v3/covid-19";

/// Window used by [`StatsSource::fetch_weekly_trends`].
pub const WEEKLY_TREND_DAYS: u32 = 7;

/// Anything that can answer the four logical queries of the statistics API.
pub trait StatsSource {
    /// `GET /countries`
    fn fetch_all_countries(&self) -> Result<Vec<CountryStat>, NetworkError>;

    /// `GET /countries/{name}`; `name` may be a country name or ISO code.
    fn fetch_country(&self, name: &str) -> Result<CountryStat, NetworkError>;

    /// `GET /historical/{key}?lastdays={days}`, one request, no fallback.
    fn fetch_historical_raw(&self, key: &str, days: u32)
    -> Result<HistoricalResponse, NetworkError>;

    /// `GET /all`
    fn fetch_global(&self) -> Result<GlobalStat, NetworkError>;

    /// Historical series for `name`, resolving through the ISO-2 code when needed.
    ///
    /// The API indexes some series by name and others by code, and accepts
    /// unknown names with an empty body instead of an error. So: ask by name
    /// first; if that yields no timeline (or a 404), look up the country
    /// record, take its ISO-2 code and ask again.
    fn fetch_historical(&self, name: &str, days: u32) -> Result<HistoricalTimeline, NetworkError> {
        match self.fetch_historical_raw(name, days) {
            Ok(resp) => {
                if let Some(timeline) = resp.into_timeline() {
                    return Ok(timeline);
                }
                debug!("no timeline for {:?}, resolving ISO-2 code", name);
            }
            Err(e) if e.is_not_found() => {
                debug!("historical lookup for {:?} not found, resolving ISO-2 code", name);
            }
            Err(e) => return Err(e),
        }

        let country = self.fetch_country(name)?;
        let code = match country.iso2() {
            Some(code) => code.to_string(),
            None => {
                warn!("country record for {:?} has no ISO-2 code", name);
                return Err(NetworkError::MissingTimeline {
                    country: name.to_string(),
                });
            }
        };

        self.fetch_historical_raw(&code, days)?
            .into_timeline()
            .ok_or_else(|| NetworkError::MissingTimeline {
                country: name.to_string(),
            })
    }

    /// Last week of the historical series.
    fn fetch_weekly_trends(&self, name: &str) -> Result<HistoricalTimeline, NetworkError> {
        self.fetch_historical(name, WEEKLY_TREND_DAYS)
    }

    /// One request per name, all in flight at once. Results keep the order of
    /// `names`. Any failure fails the whole batch.
    fn fetch_countries(&self, names: &[String]) -> Result<Vec<CountryStat>, NetworkError>
    where
        Self: Sync,
    {
        let results: Vec<(&String, Result<CountryStat, NetworkError>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = names
                    .iter()
                    .map(|name| (name, scope.spawn(move || self.fetch_country(name))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(name, handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(NetworkError::WorkerPanicked {
                                country: name.clone(),
                            })
                        });
                        (name, result)
                    })
                    .collect()
            });

        let total = results.len();
        let mut out = Vec::with_capacity(total);
        let mut failed = Vec::new();
        let mut first = None;
        for (name, result) in results {
            match result {
                Ok(stat) => out.push(stat),
                Err(e) => {
                    failed.push(name.clone());
                    first.get_or_insert(e);
                }
            }
        }

        match first {
            None => Ok(out),
            Some(first) => {
                let err = NetworkError::Batch {
                    total,
                    failed,
                    first: Box::new(first),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }
}

macro_rules! forward_stats_source {
    ($($ptr:ty),*) => {$(
        impl<T: StatsSource + ?Sized> StatsSource for $ptr {
            fn fetch_all_countries(&self) -> Result<Vec<CountryStat>, NetworkError> {
                (**self).fetch_all_countries()
            }

            fn fetch_country(&self, name: &str) -> Result<CountryStat, NetworkError> {
                (**self).fetch_country(name)
            }

            fn fetch_historical_raw(
                &self,
                key: &str,
                days: u32,
            ) -> Result<HistoricalResponse, NetworkError> {
                (**self).fetch_historical_raw(key, days)
            }

            fn fetch_global(&self) -> Result<GlobalStat, NetworkError> {
                (**self).fetch_global()
            }
        }
    )*};
}

forward_stats_source!(&T, std::sync::Arc<T>, Box<T>);

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Total per-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP implementation of [`StatsSource`].
#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

// Allow -, _, . unescaped; everything else (spaces in "South Korea") is encoded.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(segment: &str) -> String {
    percent_encoding::utf8_percent_encode(segment.trim(), SAFE).to_string()
}

impl Client {
    /// Client against the public API with default timeouts.
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, NetworkError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("epistats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| NetworkError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, http })
    }

    /// GET `path` (relative to the base URL) and decode the JSON body.
    /// Every request is logged; every failure is logged before it is returned.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let url = format!("{}{}", self.base_url, path);
        info!("GET {}", url);
        self.send(&url).inspect_err(|e| error!("{}", e))
    }

    fn send<T: DeserializeOwned>(&self, url: &str) -> Result<T, NetworkError> {
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|source| NetworkError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            // The API explains failures as `{"message": "..."}`.
            let body = resp.text().unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().map_err(|source| NetworkError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| NetworkError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl StatsSource for Client {
    fn fetch_all_countries(&self) -> Result<Vec<CountryStat>, NetworkError> {
        self.get_json("/countries")
    }

    fn fetch_country(&self, name: &str) -> Result<CountryStat, NetworkError> {
        self.get_json(&format!("/countries/{}", enc(name)))
    }

    fn fetch_historical_raw(
        &self,
        key: &str,
        days: u32,
    ) -> Result<HistoricalResponse, NetworkError> {
        self.get_json(&format!("/historical/{}?lastdays={}", enc(key), days))
    }

    fn fetch_global(&self) -> Result<GlobalStat, NetworkError> {
        self.get_json("/all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(enc("South Korea"), "South%20Korea");
        assert_eq!(enc(" USA "), "USA");
        assert_eq!(enc("Côte d'Ivoire"), "C%C3%B4te%20d%27Ivoire");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = Client::with_config(ClientConfig {
            base_url: "http://localhost:9/v3/covid-19/".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9/v3/covid-19");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let client = Client::with_config(ClientConfig {
            // Port 9 (discard) on loopback: nothing listens there in test sandboxes.
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.fetch_country("USA").unwrap_err();
        assert!(matches!(err, NetworkError::Transport { .. }), "{err:?}");
    }
}
