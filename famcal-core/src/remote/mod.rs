//! Remote backend: row shapes, conversions and the backend interface.
//!
//! The hosted backend stores one row per event with absolute start/end
//! timestamps. Locally an event is filed under the calendar day of its start
//! in the viewer's timezone, with a time-of-day or the all-day sentinel.

pub mod rest;
pub mod session;

use std::future::Future;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::constants::NO_NOTES_SENTINEL;
use crate::date_key::DayKey;
use crate::error::{FamcalError, FamcalResult};
use crate::event::{Event, EventColor, EventTime, ResolvedDraft};
use crate::store::EventsByDate;

/// A row of the remote events relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Body sent on insert/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePayload {
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub notes: String,
    pub color: EventColor,
}

impl RemoteRow {
    /// Day the row is filed under, in `tz`.
    pub fn day_key<Tz: TimeZone>(&self, tz: &Tz) -> DayKey {
        DayKey::from_date(self.start_at.with_timezone(tz).date_naive())
    }

    /// Local event shape, with times rendered in `tz`.
    pub fn to_event<Tz: TimeZone>(&self, tz: &Tz) -> Event {
        let time = if self.all_day {
            EventTime::AllDay
        } else {
            let local = self.start_at.with_timezone(tz).time();
            EventTime::At(truncate_to_minute(local))
        };

        let notes = match self.notes.as_deref() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => NO_NOTES_SENTINEL.to_string(),
        };

        // Unknown colors fall back to none rather than rejecting the row.
        let color = self
            .color
            .as_deref()
            .and_then(EventColor::from_name)
            .unwrap_or_default();

        Event {
            id: self.id.clone(),
            time,
            title: self.title.clone(),
            notes,
            color,
        }
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

/// Group rows by local day, keeping the order they arrived in.
pub fn event_map_from_rows<Tz: TimeZone>(rows: &[RemoteRow], tz: &Tz) -> EventsByDate {
    let mut map = EventsByDate::new();
    for row in rows {
        map.entry(row.day_key(tz)).or_default().push(row.to_event(tz));
    }
    map
}

/// Build the remote row body for a validated draft.
///
/// All-day events span local midnight to the next local midnight; timed
/// events last one hour.
pub fn draft_to_payload<Tz: TimeZone>(draft: &ResolvedDraft, tz: &Tz) -> FamcalResult<RemotePayload> {
    let day = draft.date_key.to_date()?;

    let (start_local, end_local, all_day) = match draft.time {
        EventTime::AllDay => {
            let start = day.and_time(NaiveTime::MIN);
            (start, start + Duration::days(1), true)
        }
        EventTime::At(time) => {
            let start = day.and_time(time);
            (start, start + Duration::hours(1), false)
        }
    };

    let resolve = |naive: chrono::NaiveDateTime| -> FamcalResult<DateTime<Utc>> {
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                FamcalError::Validation(format!("{} does not exist in the local timezone", naive))
            })
    };

    Ok(RemotePayload {
        title: draft.title.clone(),
        start_at: resolve(start_local)?,
        end_at: resolve(end_local)?,
        all_day,
        notes: draft.notes.clone(),
        color: draft.color,
    })
}

/// Something changed in the remote events relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice;

/// Live subscription to remote changes. Dropping it stops the listener.
pub struct ChangeFeed {
    receiver: mpsc::Receiver<ChangeNotice>,
    task: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    pub fn new(receiver: mpsc::Receiver<ChangeNotice>, task: Option<JoinHandle<()>>) -> Self {
        ChangeFeed { receiver, task }
    }

    /// Wait for the next change; `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeNotice> {
        self.receiver.recv().await
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Operations the hosted backend offers for the events relation.
pub trait EventBackend: Send + Sync {
    /// All visible rows, ordered by start ascending.
    fn list_events(&self) -> impl Future<Output = FamcalResult<Vec<RemoteRow>>> + Send;

    fn insert_event(&self, payload: &RemotePayload) -> impl Future<Output = FamcalResult<RemoteRow>> + Send;

    fn update_event(
        &self,
        id: &str,
        payload: &RemotePayload,
    ) -> impl Future<Output = FamcalResult<RemoteRow>> + Send;

    fn delete_event(&self, id: &str) -> impl Future<Output = FamcalResult<()>> + Send;

    fn subscribe(&self) -> FamcalResult<ChangeFeed>;
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory backend for tests.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct MemoryBackend {
        pub rows: Mutex<Vec<RemoteRow>>,
        pub fail_reads: AtomicBool,
        pub fail_writes: AtomicBool,
        next_id: AtomicU32,
        senders: Mutex<Vec<mpsc::Sender<ChangeNotice>>>,
    }

    impl MemoryBackend {
        pub fn with_rows(rows: Vec<RemoteRow>) -> Self {
            let backend = MemoryBackend::default();
            *backend.rows.lock().unwrap() = rows;
            backend
        }

        /// Simulate another session changing data.
        pub fn notify(&self) {
            for sender in self.senders.lock().unwrap().iter() {
                let _ = sender.try_send(ChangeNotice);
            }
        }

        /// Close every open feed.
        pub fn close_feeds(&self) {
            self.senders.lock().unwrap().clear();
        }

        fn row_from(&self, id: String, payload: &RemotePayload) -> RemoteRow {
            RemoteRow {
                id,
                title: payload.title.clone(),
                start_at: payload.start_at,
                end_at: payload.end_at,
                all_day: payload.all_day,
                notes: Some(payload.notes.clone()),
                color: Some(payload.color.name().to_string()),
            }
        }

        fn check_write(&self) -> FamcalResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(FamcalError::RemoteWrite("backend unavailable".into()));
            }
            Ok(())
        }
    }

    impl EventBackend for MemoryBackend {
        async fn list_events(&self) -> FamcalResult<Vec<RemoteRow>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(FamcalError::RemoteRead("backend unavailable".into()));
            }
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by_key(|r| r.start_at);
            Ok(rows)
        }

        async fn insert_event(&self, payload: &RemotePayload) -> FamcalResult<RemoteRow> {
            self.check_write()?;
            let id = format!("row-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            let row = self.row_from(id, payload);
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update_event(&self, id: &str, payload: &RemotePayload) -> FamcalResult<RemoteRow> {
            self.check_write()?;
            let row = self.row_from(id.to_string(), payload);
            let mut rows = self.rows.lock().unwrap();
            let slot = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| FamcalError::RemoteWrite(format!("no row {}", id)))?;
            *slot = row.clone();
            Ok(row)
        }

        async fn delete_event(&self, id: &str) -> FamcalResult<()> {
            self.check_write()?;
            self.rows.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }

        fn subscribe(&self) -> FamcalResult<ChangeFeed> {
            let (tx, rx) = mpsc::channel(8);
            self.senders.lock().unwrap().push(tx);
            Ok(ChangeFeed::new(rx, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn row(id: &str, start: &str, all_day: bool) -> RemoteRow {
        let start_at: DateTime<Utc> = start.parse().unwrap();
        RemoteRow {
            id: id.to_string(),
            title: "일정".to_string(),
            start_at,
            end_at: start_at + Duration::hours(1),
            all_day,
            notes: None,
            color: None,
        }
    }

    #[test]
    fn all_day_row_uses_sentinel_and_local_day() {
        let r = row("r1", "2025-07-04T00:00:00Z", true);

        let map = event_map_from_rows(std::slice::from_ref(&r), &Utc);
        let day = DayKey::parse("2025-07-04").unwrap();
        assert_eq!(map[&day][0].time, EventTime::AllDay);
        assert_eq!(map[&day][0].notes, NO_NOTES_SENTINEL);
        assert_eq!(map[&day][0].color, EventColor::None);

        // Five hours west of UTC the same instant is still July 3rd.
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(r.day_key(&west).as_str(), "2025-07-03");
    }

    #[test]
    fn timed_row_renders_local_time() {
        let r = row("r1", "2025-06-15T05:00:00Z", false);
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let event = r.to_event(&seoul);
        assert_eq!(event.time.to_string(), "14:00");
        assert_eq!(r.day_key(&seoul).as_str(), "2025-06-15");
    }

    #[test]
    fn rows_keep_arrival_order_within_day() {
        let rows = vec![
            row("a", "2025-06-15T01:00:00Z", false),
            row("b", "2025-06-15T03:00:00Z", false),
            row("c", "2025-06-16T01:00:00Z", false),
        ];
        let map = event_map_from_rows(&rows, &Utc);
        let ids: Vec<_> = map[&DayKey::parse("2025-06-15").unwrap()]
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn unknown_color_falls_back_to_none() {
        let mut r = row("a", "2025-06-15T01:00:00Z", false);
        r.color = Some("magenta".into());
        r.notes = Some("준비물".into());
        let event = r.to_event(&Utc);
        assert_eq!(event.color, EventColor::None);
        assert_eq!(event.notes, "준비물");
    }

    fn draft(time: EventTime) -> ResolvedDraft {
        ResolvedDraft {
            title: "회의".into(),
            date_key: DayKey::from_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()),
            time,
            notes: String::new(),
            color: EventColor::Green,
        }
    }

    #[test]
    fn all_day_payload_spans_local_day() {
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let payload = draft_to_payload(&draft(EventTime::AllDay), &seoul).unwrap();
        assert_eq!(payload.start_at.to_rfc3339(), "2025-06-14T15:00:00+00:00");
        assert_eq!(payload.end_at - payload.start_at, Duration::days(1));
        assert!(payload.all_day);
        assert_eq!(payload.notes, "");
    }

    #[test]
    fn timed_payload_lasts_one_hour() {
        let payload = draft_to_payload(&draft(EventTime::parse("23:30").unwrap()), &Utc).unwrap();
        assert_eq!(payload.start_at.to_rfc3339(), "2025-06-15T23:30:00+00:00");
        assert_eq!(payload.end_at.to_rfc3339(), "2025-06-16T00:30:00+00:00");
        assert!(!payload.all_day);
    }

    #[test]
    fn payload_round_trips_through_row() {
        let payload = draft_to_payload(&draft(EventTime::parse("09:15").unwrap()), &Utc).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["color"], "green");

        let r = RemoteRow {
            id: "x".into(),
            title: payload.title.clone(),
            start_at: payload.start_at,
            end_at: payload.end_at,
            all_day: payload.all_day,
            notes: Some(payload.notes.clone()),
            color: Some("green".into()),
        };
        let event = r.to_event(&Utc);
        assert_eq!(event.time.to_string(), "09:15");
        assert_eq!(r.day_key(&Utc).as_str(), "2025-06-15");
    }
}
