use chrono::NaiveDate;
use epistats::models::{CountryStat, GlobalStat, HistoricalResponse, Metric};

#[test]
fn parse_country_record() {
    let sample = r#"
    {
      "updated": 1700000000000,
      "country": "Germany",
      "countryInfo": {"_id": 276, "iso2": "DE", "iso3": "DEU", "lat": 51, "long": 9,
                      "flag": "https://disease.sh/assets/img/flags/de.png"},
      "cases": 38437756,
      "todayCases": 0,
      "deaths": 174979,
      "todayDeaths": 0,
      "recovered": 38240600,
      "todayRecovered": 0,
      "active": 22177,
      "critical": null,
      "casesPerOneMillion": 458247,
      "deathsPerOneMillion": 2086,
      "tests": 122332384,
      "testsPerOneMillion": 1458359.4,
      "population": 83883596,
      "continent": "Europe",
      "oneCasePerPeople": 2
    }
    "#;

    let c: CountryStat = serde_json::from_str(sample).unwrap();
    assert_eq!(c.country, "Germany");
    assert_eq!(c.iso2(), Some("DE"));
    assert_eq!(c.country_info.id, Some(276));
    assert_eq!(c.cases, Some(38_437_756));
    assert_eq!(c.critical, None);
    assert_eq!(c.value(Metric::Critical), None);
    assert_eq!(c.value(Metric::TestsPerOneMillion), Some(1_458_359.4));
    assert_eq!(c.population, Some(83_883_596));
    assert_eq!(c.continent.as_deref(), Some("Europe"));
    assert_eq!(c.flag(), Some("https://disease.sh/assets/img/flags/de.png"));
    assert_eq!(c.updated_at().unwrap().timestamp_millis(), 1_700_000_000_000);
}

#[test]
fn parse_sparse_country_record() {
    let c: CountryStat =
        serde_json::from_str(r#"{"country": "MS Zaandam", "countryInfo": {"_id": null, "iso2": null}, "cases": 9.0}"#)
            .unwrap();
    assert_eq!(c.iso2(), None);
    assert_eq!(c.cases, Some(9));
    assert_eq!(c.population, None);
    assert_eq!(c.value(Metric::Deaths), None);
}

#[test]
fn negative_counts_are_rejected() {
    let res = serde_json::from_str::<CountryStat>(r#"{"country": "X", "cases": -3}"#);
    assert!(res.is_err());
}

#[test]
fn parse_historical_response_in_date_order() {
    let sample = r#"
    {
      "country": "USA",
      "province": ["mainland"],
      "timeline": {
        "cases":     {"9/29/22": 96000000, "9/30/22": 96100000, "10/1/22": 96150000},
        "deaths":    {"9/29/22": 1060000,  "9/30/22": 1060500,  "10/1/22": 1060700},
        "recovered": {}
      }
    }
    "#;
    let resp: HistoricalResponse = serde_json::from_str(sample).unwrap();
    assert_eq!(resp.country.as_deref(), Some("USA"));
    assert_eq!(resp.province, ["mainland"]);

    let t = resp.into_timeline().unwrap();
    let dates: Vec<NaiveDate> = t.cases.keys().copied().collect();
    assert_eq!(
        dates,
        [
            NaiveDate::from_ymd_opt(2022, 9, 29).unwrap(),
            NaiveDate::from_ymd_opt(2022, 9, 30).unwrap(),
            NaiveDate::from_ymd_opt(2022, 10, 1).unwrap(),
        ]
    );
    assert!(t.recovered.is_empty());
}

#[test]
fn historical_without_timeline_is_detected() {
    let resp: HistoricalResponse =
        serde_json::from_str(r#"{"country": "XX", "province": null}"#).unwrap();
    assert!(resp.province.is_empty());
    assert!(resp.into_timeline().is_none());

    let resp: HistoricalResponse = serde_json::from_str(
        r#"{"country": "XX", "province": "all", "timeline": {"cases": {}, "deaths": {}}}"#,
    )
    .unwrap();
    assert_eq!(resp.province, ["all"]);
    assert!(resp.into_timeline().is_none(), "empty series count as no timeline");
}

#[test]
fn bad_timeline_date_is_a_decode_error() {
    let res = serde_json::from_str::<HistoricalResponse>(
        r#"{"timeline": {"cases": {"someday": 1}, "deaths": {}}}"#,
    );
    assert!(res.is_err());
}

#[test]
fn parse_global_totals() {
    let g: GlobalStat = serde_json::from_str(
        r#"{"updated": 1700000000000, "cases": 704753890, "todayCases": 0, "deaths": 7010681,
            "population": 7944935131, "affectedCountries": 231}"#,
    )
    .unwrap();
    assert_eq!(g.cases, Some(704_753_890));
    assert_eq!(g.affected_countries, Some(231));
    assert!(g.updated_at().is_some());
}
