//! Stable string keys for calendar days and months.
//!
//! A `DayKey` is `YYYY-MM-DD`, a `MonthKey` is `YYYY-MM`. Both are built from
//! local calendar fields only; no timezone conversion happens here.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_KEY_YEAR, MIN_KEY_YEAR};
use crate::error::{FamcalError, FamcalResult};

/// Canonical identity of a calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(String);

/// Identity of a month descriptor (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey(String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        DayKey(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        ))
    }

    /// Parse and validate a key, rejecting anything that is not a real date.
    pub fn parse(s: &str) -> FamcalResult<Self> {
        let date = parse_day(s)?;
        Ok(DayKey::from_date(date))
    }

    pub fn to_date(&self) -> FamcalResult<NaiveDate> {
        parse_day(&self.0)
    }

    pub fn month_key(&self) -> MonthKey {
        match self.0.rsplit_once('-') {
            Some((month, _)) => MonthKey(month.to_string()),
            None => MonthKey(self.0.clone()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        MonthKey(format!("{:04}-{:02}", date.year(), date.month()))
    }

    pub fn parse(s: &str) -> FamcalResult<Self> {
        let date = parse_month(s)?;
        Ok(MonthKey::from_date(date))
    }

    /// First day of the month this key names.
    pub fn to_date(&self) -> FamcalResult<NaiveDate> {
        parse_month(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DayKey {
    type Err = FamcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayKey::parse(s)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = FamcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonthKey::parse(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = FamcalError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        DayKey::parse(&s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = FamcalError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        MonthKey::parse(&s)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.0
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.0
    }
}

pub fn to_day_key(date: NaiveDate) -> DayKey {
    DayKey::from_date(date)
}

pub fn day_key_to_date(key: &str) -> FamcalResult<NaiveDate> {
    parse_day(key)
}

pub fn to_month_key(date: NaiveDate) -> MonthKey {
    MonthKey::from_date(date)
}

pub fn month_key_to_date(key: &str) -> FamcalResult<NaiveDate> {
    parse_month(key)
}

/// Signed number of month boundaries between `base` and `target`.
pub fn month_offset(base: NaiveDate, target: NaiveDate) -> i32 {
    (target.year() - base.year()) * 12 + (target.month() as i32 - base.month() as i32)
}

/// First day of the month `offset` months away from the month containing `base`.
///
/// Fails when the result would leave the years a key can name.
pub fn shift_month(base: NaiveDate, offset: i32) -> FamcalResult<NaiveDate> {
    let out_of_range =
        || FamcalError::Validation(format!("Month offset {offset} from {base} is out of range"));

    let total = (base.year() * 12 + base.month0() as i32)
        .checked_add(offset)
        .ok_or_else(out_of_range)?;
    let year = total.div_euclid(12);
    if !(MIN_KEY_YEAR..=MAX_KEY_YEAR).contains(&year) {
        return Err(out_of_range());
    }

    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Days in the month starting at `first`: the day before the next month's first day.
pub fn days_in_month(first: NaiveDate) -> u32 {
    // Only December of the last key year has no following month.
    shift_month(first, 1)
        .ok()
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Split `key` on `-` into numeric parts of exactly the given widths.
fn numeric_parts(key: &str, widths: &[usize]) -> FamcalResult<Vec<i32>> {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() != widths.len() {
        return Err(FamcalError::InvalidKey(key.to_string()));
    }

    parts
        .iter()
        .zip(widths)
        .map(|(part, &width)| {
            if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FamcalError::InvalidKey(key.to_string()));
            }
            part.parse::<i32>()
                .map_err(|_| FamcalError::InvalidKey(key.to_string()))
        })
        .collect()
}

fn parse_day(key: &str) -> FamcalResult<NaiveDate> {
    let parts = numeric_parts(key, &[4, 2, 2])?;
    NaiveDate::from_ymd_opt(parts[0], parts[1] as u32, parts[2] as u32)
        .ok_or_else(|| FamcalError::InvalidKey(key.to_string()))
}

fn parse_month(key: &str) -> FamcalResult<NaiveDate> {
    let parts = numeric_parts(key, &[4, 2])?;
    NaiveDate::from_ymd_opt(parts[0], parts[1] as u32, 1)
        .ok_or_else(|| FamcalError::InvalidKey(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_key_zero_pads() {
        assert_eq!(to_day_key(date(2025, 6, 5)).as_str(), "2025-06-05");
        assert_eq!(to_month_key(date(2025, 6, 5)).as_str(), "2025-06");
    }

    #[test]
    fn day_key_rejects_malformed() {
        assert!(day_key_to_date("2025-06").is_err());
        assert!(day_key_to_date("2025-06-01-02").is_err());
        assert!(day_key_to_date("2025-0a-01").is_err());
        assert!(day_key_to_date("2025--01").is_err());
        assert!(day_key_to_date("2025-02-30").is_err());
        assert!(day_key_to_date("2025-6-1").is_err());
        assert!(day_key_to_date("02025-06-01").is_err());
        assert!(month_key_to_date("2025-6").is_err());
        assert!(DayKey::parse("2025-6-01").is_err());
    }

    #[test]
    fn keys_validate_when_deserialized() {
        let key: DayKey = serde_json::from_str("\"2025-06-15\"").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-06-15\"");
        assert!(serde_json::from_str::<DayKey>("\"2025-02-30\"").is_err());
        assert!(serde_json::from_str::<MonthKey>("\"2025-13\"").is_err());
    }

    #[test]
    fn month_key_maps_to_first_day() {
        assert_eq!(month_key_to_date("2025-06").unwrap(), date(2025, 6, 1));
        assert!(month_key_to_date("2025-13").is_err());
    }

    #[test]
    fn day_key_knows_its_month() {
        let key = DayKey::parse("2024-02-29").unwrap();
        assert_eq!(key.month_key().as_str(), "2024-02");
    }

    #[test]
    fn month_offset_crosses_years() {
        assert_eq!(month_offset(date(2025, 6, 1), date(2025, 6, 30)), 0);
        assert_eq!(month_offset(date(2025, 6, 1), date(2026, 1, 1)), 7);
        assert_eq!(month_offset(date(2025, 6, 1), date(2024, 12, 31)), -6);
    }

    #[test]
    fn shift_month_wraps_both_ways() {
        assert_eq!(shift_month(date(2025, 6, 15), -12).unwrap(), date(2024, 6, 1));
        assert_eq!(shift_month(date(2025, 11, 1), 3).unwrap(), date(2026, 2, 1));
        assert_eq!(shift_month(date(2025, 1, 1), -1).unwrap(), date(2024, 12, 1));
    }

    #[test]
    fn shift_month_rejects_offsets_past_key_years() {
        let base = date(2025, 6, 1);
        assert!(matches!(shift_month(base, i32::MAX - 5), Err(FamcalError::Validation(_))));
        assert!(shift_month(base, i32::MIN).is_err());
        assert!(shift_month(date(9999, 12, 1), 1).is_err());
        assert_eq!(shift_month(date(9999, 11, 1), 1).unwrap(), date(9999, 12, 1));
        assert_eq!(days_in_month(date(9999, 12, 1)), 31);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(date(2024, 2, 1)), 29);
        assert_eq!(days_in_month(date(2025, 2, 1)), 28);
        assert_eq!(days_in_month(date(2025, 12, 1)), 31);
        assert_eq!(days_in_month(date(2025, 4, 1)), 30);
    }

    proptest! {
        #[test]
        fn day_key_round_trips(days in 0i64..200_000) {
            let d = date(1900, 1, 1) + chrono::Duration::days(days);
            let key = to_day_key(d);
            prop_assert_eq!(day_key_to_date(key.as_str()).unwrap(), d);
        }

        #[test]
        fn shift_then_offset_is_identity(offset in -2400i32..2400) {
            let base = date(2025, 6, 1);
            prop_assert_eq!(month_offset(base, shift_month(base, offset).unwrap()), offset);
        }
    }
}
