//! Local event types.
//!
//! The serialized shape matches what is persisted to `events.json`, so the
//! sentinels for all-day time and empty notes are stored verbatim.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{
    ALL_DAY_SENTINEL, BASICS_KEYWORD, DEADLINE_KEYWORD, DEFAULT_DRAFT_TIME, NO_NOTES_SENTINEL,
};
use crate::date_key::DayKey;
use crate::error::{FamcalError, FamcalResult};

/// A calendar event as kept in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub time: EventTime,
    pub title: String,
    pub notes: String,
    #[serde(default)]
    pub color: EventColor,
}

impl Event {
    /// Notes as the user typed them (the sentinel reads back as empty).
    pub fn user_notes(&self) -> &str {
        if self.notes == NO_NOTES_SENTINEL {
            ""
        } else {
            &self.notes
        }
    }

    pub fn is_all_day(&self) -> bool {
        self.time == EventTime::AllDay
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Either all-day or a local time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventTime {
    AllDay,
    At(NaiveTime),
}

impl EventTime {
    pub fn parse(s: &str) -> FamcalResult<Self> {
        if s == ALL_DAY_SENTINEL {
            return Ok(EventTime::AllDay);
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(EventTime::At)
            .map_err(|_| FamcalError::Validation(format!("Invalid time '{}'. Expected HH:MM", s)))
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::AllDay => write!(f, "{}", ALL_DAY_SENTINEL),
            EventTime::At(t) => write!(f, "{}", t.format("%H:%M")),
        }
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EventTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The fixed six-color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    #[default]
    None,
    Red,
    Orange,
    Green,
    Blue,
    Purple,
}

/// Display attributes for a palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub label: &'static str,
    pub bg: &'static str,
    pub fg: &'static str,
}

impl EventColor {
    pub const ALL: [EventColor; 6] = [
        EventColor::None,
        EventColor::Red,
        EventColor::Orange,
        EventColor::Green,
        EventColor::Blue,
        EventColor::Purple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventColor::None => "none",
            EventColor::Red => "red",
            EventColor::Orange => "orange",
            EventColor::Green => "green",
            EventColor::Blue => "blue",
            EventColor::Purple => "purple",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn swatch(&self) -> Swatch {
        match self {
            EventColor::None => Swatch { label: "없음", bg: "#eef0f4", fg: "#1c1c1e" },
            EventColor::Red => Swatch { label: "빨강", bg: "#ff3b30", fg: "#ffffff" },
            EventColor::Orange => Swatch { label: "주황", bg: "#ff9500", fg: "#ffffff" },
            EventColor::Green => Swatch { label: "초록", bg: "#34c759", fg: "#ffffff" },
            EventColor::Blue => Swatch { label: "파랑", bg: "#007aff", fg: "#ffffff" },
            EventColor::Purple => Swatch { label: "보라", bg: "#5856d6", fg: "#ffffff" },
        }
    }
}

impl fmt::Display for EventColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EventColor {
    type Err = FamcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventColor::from_name(s).ok_or_else(|| {
            FamcalError::Validation(format!(
                "Unknown color '{}'. Expected one of: none, red, orange, green, blue, purple",
                s
            ))
        })
    }
}

/// Keyword policy applied when saving: a title mentioning a deadline is
/// always blue, otherwise a title mentioning basics is always red, otherwise
/// the user's choice stands.
pub fn resolve_color_by_keyword(title: &str, selected: EventColor) -> EventColor {
    if title.contains(DEADLINE_KEYWORD) {
        EventColor::Blue
    } else if title.contains(BASICS_KEYWORD) {
        EventColor::Red
    } else {
        selected
    }
}

/// Contents of the add/edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub date_key: DayKey,
    pub all_day: bool,
    pub time: String,
    pub notes: String,
    pub color: EventColor,
}

impl EventDraft {
    /// Blank form for a day.
    pub fn new(date_key: DayKey) -> Self {
        EventDraft {
            title: String::new(),
            date_key,
            all_day: false,
            time: DEFAULT_DRAFT_TIME.to_string(),
            notes: String::new(),
            color: EventColor::None,
        }
    }

    /// Form pre-filled from an existing event.
    pub fn from_event(date_key: DayKey, event: &Event) -> Self {
        let (all_day, time) = match event.time {
            EventTime::AllDay => (true, DEFAULT_DRAFT_TIME.to_string()),
            EventTime::At(_) => (false, event.time.to_string()),
        };

        EventDraft {
            title: event.title.clone(),
            date_key,
            all_day,
            time,
            notes: event.user_notes().to_string(),
            color: event.color,
        }
    }

    /// Validate the form and produce the normalized values that get saved.
    pub fn resolve(&self) -> FamcalResult<ResolvedDraft> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FamcalError::Validation("Title must not be empty".into()));
        }

        let time = if self.all_day {
            EventTime::AllDay
        } else if self.time.trim().is_empty() {
            EventTime::parse(DEFAULT_DRAFT_TIME)?
        } else {
            EventTime::parse(self.time.trim())?
        };

        let notes = self.notes.trim();

        Ok(ResolvedDraft {
            title: title.to_string(),
            date_key: self.date_key.clone(),
            time,
            notes: notes.to_string(),
            color: resolve_color_by_keyword(title, self.color),
        })
    }
}

/// A validated draft: trimmed title, parsed time, keyword color applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDraft {
    pub title: String,
    pub date_key: DayKey,
    pub time: EventTime,
    /// Trimmed notes, possibly empty (remote rows store empty notes as-is).
    pub notes: String,
    pub color: EventColor,
}

impl ResolvedDraft {
    /// Local event with the given id; empty notes become the sentinel.
    pub fn into_event(self, id: String) -> Event {
        let notes = if self.notes.is_empty() {
            NO_NOTES_SENTINEL.to_string()
        } else {
            self.notes
        };

        Event {
            id,
            time: self.time,
            title: self.title,
            notes,
            color: self.color,
        }
    }
}

/// Id for an event created without a backend.
pub fn local_event_id(date_key: &DayKey, now_millis: i64) -> String {
    format!("local-{}-{}", date_key, now_millis)
}
