//! Public holidays shown on the month grid.
//!
//! A built-in table covers the years the app shipped with; a configured
//! lookup endpoint can add or override entries per year.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde_json::Value;

use crate::constants::DEFAULT_HOLIDAY_NAME;
use crate::date_key::{DayKey, MonthKey};
use crate::error::{FamcalError, FamcalResult};

/// Day key to holiday display name.
pub type HolidaysByDate = BTreeMap<DayKey, String>;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static FALLBACK_HOLIDAYS: &[(&str, &str)] = &[
    ("2026-01-01", "신정"),
    ("2026-02-16", "설날"),
    ("2026-02-17", "설날"),
    ("2026-02-18", "설날"),
    ("2026-03-01", "삼일절"),
    ("2026-05-05", "어린이날"),
    ("2026-05-24", "부처님오신날"),
    ("2026-06-06", "현충일"),
    ("2026-08-15", "광복절"),
    ("2026-09-24", "추석"),
    ("2026-09-25", "추석"),
    ("2026-09-26", "추석"),
    ("2026-10-03", "개천절"),
    ("2026-10-09", "한글날"),
    ("2026-12-25", "기독탄신일"),
    ("2027-01-01", "신정"),
    ("2027-02-05", "설날"),
    ("2027-02-06", "설날"),
    ("2027-02-07", "설날"),
    ("2027-03-01", "삼일절"),
    ("2027-05-05", "어린이날"),
    ("2027-05-13", "부처님오신날"),
    ("2027-06-06", "현충일"),
    ("2027-08-15", "광복절"),
    ("2027-09-14", "추석"),
    ("2027-09-15", "추석"),
    ("2027-09-16", "추석"),
    ("2027-10-03", "개천절"),
    ("2027-10-09", "한글날"),
    ("2027-12-25", "기독탄신일"),
];

pub fn fallback_holidays() -> HolidaysByDate {
    FALLBACK_HOLIDAYS
        .iter()
        .filter_map(|(date, name)| DayKey::parse(date).ok().map(|key| (key, name.to_string())))
        .collect()
}

/// Turn `"2026-03-01"`, `"20260301"` or `20260301` into a day key.
pub fn normalize_date(raw: &Value) -> Option<DayKey> {
    let text = match raw {
        Value::String(s) => s.trim().replace('-', ""),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if text.len() != 8 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    DayKey::parse(&format!("{}-{}-{}", &text[0..4], &text[4..6], &text[6..8])).ok()
}

/// Extract holidays from a lookup response.
///
/// Accepts a flat `{"holidays": [...]}` list, or the legacy
/// `response.body.items.item` shape where `item` is one object or a list.
/// Items without a usable date are skipped.
pub fn parse_holiday_payload(payload: &Value) -> HolidaysByDate {
    let flat = payload
        .get("holidays")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty());

    let items: Vec<&Value> = match flat {
        Some(items) => items.iter().collect(),
        None => match payload.pointer("/response/body/items/item") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(item @ Value::Object(_)) => vec![item],
            _ => Vec::new(),
        },
    };

    items
        .into_iter()
        .filter_map(|item| {
            let date = item.get("date").or_else(|| item.get("locdate"))?;
            let key = normalize_date(date)?;
            let name = item
                .get("name")
                .or_else(|| item.get("dateName"))
                .and_then(value_to_name)
                .unwrap_or_else(|| DEFAULT_HOLIDAY_NAME.to_string());
            Some((key, name))
        })
        .collect()
}

fn value_to_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Fetch one year's holidays from `endpoint?year=YYYY`.
pub async fn fetch_year(client: &reqwest::Client, endpoint: &str, year: i32) -> FamcalResult<HolidaysByDate> {
    let holiday_err = |reason: String| FamcalError::Holiday { year, reason };

    let response = client
        .get(endpoint)
        .query(&[("year", year.to_string())])
        .send()
        .await
        .map_err(|e| holiday_err(e.to_string()))?;

    if !response.status().is_success() {
        return Err(holiday_err(format!("HTTP {}", response.status())));
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| holiday_err(format!("Unexpected response: {e}")))?;

    Ok(parse_holiday_payload(&payload))
}

/// Years still missing from an overlay, with what is needed to fetch them.
///
/// Running the fetch does not borrow the overlay, so callers can release
/// whatever guards it while the requests are in flight.
#[derive(Debug, Clone)]
pub struct HolidayFetch {
    client: reqwest::Client,
    endpoint: String,
    years: Vec<i32>,
}

impl HolidayFetch {
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Fetch every year. A failed year is logged and left out.
    pub async fn run(self) -> Vec<(i32, HolidaysByDate)> {
        let mut fetched = Vec::with_capacity(self.years.len());
        for &year in &self.years {
            match fetch_year(&self.client, &self.endpoint, year).await {
                Ok(entries) => {
                    tracing::debug!(year, count = entries.len(), "holidays fetched");
                    fetched.push((year, entries));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "holiday lookup failed, keeping fallback");
                }
            }
        }
        fetched
    }
}

pub struct HolidayOverlay {
    holidays: HolidaysByDate,
    /// Years already merged from the endpoint.
    fetched: BTreeSet<i32>,
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl HolidayOverlay {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        HolidayOverlay {
            holidays: fallback_holidays(),
            fetched: BTreeSet::new(),
            endpoint,
            client,
        }
    }

    pub fn name(&self, date_key: &DayKey) -> Option<&str> {
        self.holidays.get(date_key).map(String::as_str)
    }

    pub fn is_holiday(&self, date_key: &DayKey) -> bool {
        self.holidays.contains_key(date_key)
    }

    pub fn all(&self) -> &HolidaysByDate {
        &self.holidays
    }

    /// Holidays falling in `month`, in date order.
    pub fn in_month(&self, month: &MonthKey) -> Vec<(&DayKey, &str)> {
        self.holidays
            .iter()
            .filter(|(key, _)| key.as_str().starts_with(month.as_str()))
            .map(|(key, name)| (key, name.as_str()))
            .collect()
    }

    pub fn is_fetched(&self, year: i32) -> bool {
        self.fetched.contains(&year)
    }

    /// Remote entries win over what is already known.
    pub fn merge(&mut self, entries: HolidaysByDate) {
        self.holidays.extend(entries);
    }

    /// The fetch still needed for `years`, or `None` when there is no
    /// endpoint or every year has already been merged.
    pub fn pending(&self, years: &[i32]) -> Option<HolidayFetch> {
        let endpoint = self.endpoint.clone()?;

        let mut missing: Vec<i32> = years.iter().copied().filter(|y| !self.is_fetched(*y)).collect();
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return None;
        }

        Some(HolidayFetch {
            client: self.client.clone(),
            endpoint,
            years: missing,
        })
    }

    /// Merge the results of a `HolidayFetch` and remember those years.
    /// Returns how many entries arrived.
    pub fn apply(&mut self, fetched: Vec<(i32, HolidaysByDate)>) -> usize {
        let mut merged = 0;
        for (year, entries) in fetched {
            merged += entries.len();
            self.merge(entries);
            self.fetched.insert(year);
        }
        merged
    }

    /// Fetch and merge every year not fetched yet. Returns how many entries arrived.
    ///
    /// Without an endpoint nothing is fetched. A failed year is logged and
    /// tried again on the next refresh; the fallback table stays in effect
    /// for it meanwhile.
    pub async fn refresh(&mut self, years: &[i32]) -> usize {
        match self.pending(years) {
            Some(fetch) => {
                let fetched = fetch.run().await;
                self.apply(fetched)
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::StubServer;

    fn key(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    #[test]
    fn normalizes_both_date_forms() {
        assert_eq!(normalize_date(&json!("2026-03-01")), Some(key("2026-03-01")));
        assert_eq!(normalize_date(&json!("20260301")), Some(key("2026-03-01")));
        assert_eq!(normalize_date(&json!(20260301)), Some(key("2026-03-01")));
        assert_eq!(normalize_date(&json!("2026-3-1")), None);
        assert_eq!(normalize_date(&json!("20260231")), None);
        assert_eq!(normalize_date(&json!(null)), None);
    }

    #[test]
    fn parses_flat_list() {
        let payload = json!({
            "holidays": [
                { "date": "2028-01-01", "name": "신정" },
                { "date": "20280301" },
                { "name": "no date" }
            ]
        });

        let parsed = parse_holiday_payload(&payload);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&key("2028-01-01")], "신정");
        assert_eq!(parsed[&key("2028-03-01")], DEFAULT_HOLIDAY_NAME);
    }

    #[test]
    fn parses_legacy_single_item_and_list() {
        let single = json!({
            "response": { "body": { "items": { "item": { "locdate": 20280815, "dateName": "광복절" } } } }
        });
        assert_eq!(parse_holiday_payload(&single)[&key("2028-08-15")], "광복절");

        let list = json!({
            "response": { "body": { "items": { "item": [
                { "locdate": 20281003, "dateName": "개천절" },
                { "locdate": 20281009, "dateName": "한글날" }
            ] } } }
        });
        assert_eq!(parse_holiday_payload(&list).len(), 2);

        assert!(parse_holiday_payload(&json!({ "response": { "body": { "items": "" } } })).is_empty());
    }

    #[test]
    fn remote_entries_override_fallback() {
        let mut overlay = HolidayOverlay::new(None);
        assert_eq!(overlay.name(&key("2026-05-24")), Some("부처님오신날"));

        let mut remote = HolidaysByDate::new();
        remote.insert(key("2026-05-24"), "석가탄신일".into());
        remote.insert(key("2026-05-25"), "대체공휴일".into());
        overlay.merge(remote);

        assert_eq!(overlay.name(&key("2026-05-24")), Some("석가탄신일"));
        assert!(overlay.is_holiday(&key("2026-05-25")));
        assert_eq!(overlay.in_month(&MonthKey::parse("2026-05").unwrap()).len(), 3);
    }

    #[tokio::test]
    async fn refresh_without_endpoint_is_skipped() {
        let mut overlay = HolidayOverlay::new(None);
        assert_eq!(overlay.refresh(&[2026, 2027]).await, 0);
        assert_eq!(overlay.all(), &fallback_holidays());
    }

    #[tokio::test]
    async fn failed_years_keep_fallback() {
        let mut overlay = HolidayOverlay::new(Some("http://127.0.0.1:9/holidays".into()));
        assert_eq!(overlay.refresh(&[2026]).await, 0);
        assert_eq!(overlay.name(&key("2026-10-09")), Some("한글날"));
        assert!(!overlay.is_fetched(2026));
    }

    fn year_server() -> StubServer {
        StubServer::new(|request| {
            let year = request.query_param("year").unwrap_or_default();
            if year == "2025" {
                return (500, "{}".to_string());
            }
            let body = json!({ "holidays": [ { "date": format!("{year}-01-01"), "name": "신정" } ] });
            (200, body.to_string())
        })
    }

    #[tokio::test]
    async fn each_year_is_fetched_once() {
        let server = year_server().spawn().await;
        let mut overlay = HolidayOverlay::new(Some(server.url("/holidays")));

        assert_eq!(overlay.refresh(&[2024, 2026]).await, 2);
        for _ in 0..4 {
            assert_eq!(overlay.refresh(&[2024, 2026]).await, 0);
        }
        assert_eq!(server.requests().len(), 2);

        let years: Vec<String> = server
            .requests()
            .iter()
            .filter_map(|r| r.query_param("year"))
            .collect();
        assert_eq!(years, vec!["2024", "2026"]);
        assert_eq!(overlay.name(&key("2024-01-01")), Some("신정"));
    }

    #[tokio::test]
    async fn failed_year_is_retried_later() {
        let server = year_server().spawn().await;
        let mut overlay = HolidayOverlay::new(Some(server.url("/holidays")));

        overlay.refresh(&[2025, 2026]).await;
        assert!(overlay.is_fetched(2026));
        assert!(!overlay.is_fetched(2025));

        overlay.refresh(&[2025, 2026]).await;
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn pending_fetch_runs_detached() {
        let server = year_server().spawn().await;
        let mut overlay = HolidayOverlay::new(Some(server.url("/holidays")));

        let fetch = overlay.pending(&[2027, 2026, 2027]).unwrap();
        assert_eq!(fetch.years(), &[2026, 2027]);

        let fetched = fetch.run().await;
        assert_eq!(overlay.apply(fetched), 2);
        assert!(overlay.pending(&[2026, 2027]).is_none());
        assert!(HolidayOverlay::new(None).pending(&[2026]).is_none());
    }
}
