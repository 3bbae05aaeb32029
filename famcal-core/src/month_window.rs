//! Month descriptors and the sliding window of months kept resident for scrolling.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::constants::WINDOW_MONTH_COUNT;
use crate::date_key::{DayKey, MonthKey, days_in_month, first_of_month, shift_month};
use crate::error::{FamcalError, FamcalResult};

/// One real day in a week row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub key: DayKey,
    pub day_number: u32,
}

/// Seven slots; `None` is padding before the 1st or after the last day.
pub type WeekRow = [Option<DaySlot>; 7];

/// One month's padded week/day layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthDescriptor {
    pub key: MonthKey,
    pub first_day: NaiveDate,
    pub title: String,
    pub weeks: Vec<WeekRow>,
}

impl MonthDescriptor {
    /// Lay out the month `offset` months away from `anchor`'s month.
    pub fn build(anchor: NaiveDate, offset: i32) -> FamcalResult<Self> {
        let first_day = shift_month(anchor, offset)?;
        let total_days = days_in_month(first_day);

        let days = (1..=total_days).filter_map(|day| {
            let date = first_day.with_day(day)?;
            Some(DaySlot {
                date,
                key: DayKey::from_date(date),
                day_number: day,
            })
        });

        // 0 = Sunday, matching a week that starts on Sunday.
        let leading = first_day.weekday().num_days_from_sunday() as usize;

        let mut slots: Vec<Option<DaySlot>> = std::iter::repeat_n(None, leading)
            .chain(days.map(Some))
            .collect();

        let trailing = (7 - slots.len() % 7) % 7;
        slots.extend(std::iter::repeat_n(None, trailing));

        let weeks = slots
            .chunks(7)
            .map(|chunk| std::array::from_fn(|i| chunk[i].clone()))
            .collect();

        Ok(MonthDescriptor {
            key: MonthKey::from_date(first_day),
            first_day,
            title: month_title(first_day),
            weeks,
        })
    }

    pub fn days(&self) -> impl Iterator<Item = &DaySlot> {
        self.weeks.iter().flat_map(|week| week.iter().flatten())
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }
}

/// Display title such as `2025년 6월`.
pub fn month_title(first_day: NaiveDate) -> String {
    format!("{}년 {}월", first_day.year(), first_day.month())
}

/// Short header label such as `6월`.
pub fn header_label(date: NaiveDate) -> String {
    format!("{}월", date.month())
}

/// Tone used to color a day number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTone {
    Sun,
    Sat,
    Weekday,
}

pub fn day_tone(date: NaiveDate, is_holiday: bool) -> DayTone {
    match date.weekday().num_days_from_sunday() {
        _ if is_holiday => DayTone::Sun,
        0 => DayTone::Sun,
        6 => DayTone::Sat,
        _ => DayTone::Weekday,
    }
}

/// A fixed run of `WINDOW_MONTH_COUNT` consecutive months around an anchor month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthWindow {
    pub anchor: NaiveDate,
    pub start_offset: i32,
    pub months: Vec<MonthDescriptor>,
}

impl MonthWindow {
    /// Build months at offsets `[start_offset, start_offset + 23]` relative to `anchor`.
    ///
    /// Fails when any of those months falls outside the years a key can name.
    pub fn build(anchor: NaiveDate, start_offset: i32) -> FamcalResult<Self> {
        let anchor = first_of_month(anchor);
        let months = (0..WINDOW_MONTH_COUNT as i32)
            .map(|index| {
                let offset = start_offset.checked_add(index).ok_or_else(|| {
                    FamcalError::Validation(format!("Window offset {start_offset} is out of range"))
                })?;
                MonthDescriptor::build(anchor, offset)
            })
            .collect::<FamcalResult<Vec<_>>>()?;

        Ok(MonthWindow {
            anchor,
            start_offset,
            months,
        })
    }

    pub fn index_of(&self, key: &MonthKey) -> Option<usize> {
        self.months.iter().position(|m| &m.key == key)
    }

    pub fn get(&self, key: &MonthKey) -> Option<&MonthDescriptor> {
        self.months.iter().find(|m| &m.key == key)
    }

    pub fn first_key(&self) -> Option<&MonthKey> {
        self.months.first().map(|m| &m.key)
    }

    /// Distinct years covered by the window, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.months.iter().map(|m| m.year()).collect();
        years.dedup();
        years
    }
}
