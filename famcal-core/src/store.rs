//! In-memory event map with write-through JSON persistence.
//!
//! Every mutation builds a fresh map and swaps it in, then writes the whole
//! map to disk. A day key never maps to an empty list, and an event id lives
//! under exactly one day key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::date_key::DayKey;
use crate::error::{FamcalError, FamcalResult};
use crate::event::Event;

/// Day key to events in insertion order.
pub type EventsByDate = BTreeMap<DayKey, Vec<Event>>;

pub struct EventStore {
    events: EventsByDate,
    path: Option<PathBuf>,
}

impl EventStore {
    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        EventStore {
            events: EventsByDate::new(),
            path: None,
        }
    }

    /// Open the store backed by `path`, restoring whatever was persisted.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let events = load_initial(&path);
        EventStore {
            events,
            path: Some(path),
        }
    }

    pub fn events(&self) -> &EventsByDate {
        &self.events
    }

    pub fn on(&self, date_key: &DayKey) -> &[Event] {
        self.events.get(date_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find an event by id, returning the day it is filed under.
    pub fn find(&self, event_id: &str) -> Option<(&DayKey, &Event)> {
        self.events.iter().find_map(|(key, events)| {
            events
                .iter()
                .find(|e| e.id == event_id)
                .map(|event| (key, event))
        })
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Replace the whole map with an authoritative snapshot.
    pub fn replace_all(&mut self, events: EventsByDate) -> FamcalResult<()> {
        let events = events.into_iter().filter(|(_, list)| !list.is_empty()).collect();
        self.commit(events)
    }

    pub fn upsert(&mut self, date_key: &DayKey, event: Event) -> FamcalResult<()> {
        let next = with_upsert(&self.events, date_key, event);
        self.commit(next)
    }

    pub fn move_and_upsert(
        &mut self,
        source: &DayKey,
        target: &DayKey,
        event_id: &str,
        event: Event,
    ) -> FamcalResult<()> {
        let next = with_move(&self.events, source, target, event_id, event);
        self.commit(next)
    }

    pub fn remove(&mut self, date_key: &DayKey, event_id: &str) -> FamcalResult<()> {
        let next = with_removed(&self.events, date_key, event_id);
        self.commit(next)
    }

    /// Write the current map to disk (no-op for in-memory stores).
    pub fn persist(&self) -> FamcalResult<()> {
        match &self.path {
            Some(path) => persist(path, &self.events),
            None => Ok(()),
        }
    }

    fn commit(&mut self, next: EventsByDate) -> FamcalResult<()> {
        self.events = next;
        self.persist()
    }
}

/// Restore the persisted map; absent or unreadable data yields an empty map.
pub fn load_initial(path: &Path) -> EventsByDate {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return EventsByDate::new(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read local events");
            return EventsByDate::new();
        }
    };

    if raw.trim().is_empty() {
        return EventsByDate::new();
    }

    match serde_json::from_str::<EventsByDate>(&raw) {
        Ok(events) => events.into_iter().filter(|(_, list)| !list.is_empty()).collect(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to restore local events");
            EventsByDate::new()
        }
    }
}

/// Serialize the full map to `path`, via a temp file so readers never see a partial write.
pub fn persist(path: &Path, events: &EventsByDate) -> FamcalResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string(events)?;
    let temp = path.with_extension("json.tmp");

    std::fs::write(&temp, content)
        .map_err(|e| FamcalError::Storage(format!("Could not write {}: {e}", temp.display())))?;
    std::fs::rename(&temp, path)
        .map_err(|e| FamcalError::Storage(format!("Could not replace {}: {e}", path.display())))?;

    Ok(())
}

/// Append `event` under `date_key`, dropping any other entry with the same id first.
pub fn with_upsert(events: &EventsByDate, date_key: &DayKey, event: Event) -> EventsByDate {
    let mut next = without_id(events, &event.id);
    next.entry(date_key.clone()).or_default().push(event);
    next
}

/// Remove `event_id` from every day, then append `event` under `target`.
///
/// `source` is where the caller believes the event lived; removal does not
/// rely on it, so a stale source can never leave a duplicate behind.
pub fn with_move(
    events: &EventsByDate,
    _source: &DayKey,
    target: &DayKey,
    event_id: &str,
    event: Event,
) -> EventsByDate {
    let mut next = without_id(events, event_id);
    if event.id != event_id {
        next = without_id(&next, &event.id);
    }
    next.entry(target.clone()).or_default().push(event);
    next
}

/// Remove `event_id` from the list at `date_key`, dropping the key if it empties.
pub fn with_removed(events: &EventsByDate, date_key: &DayKey, event_id: &str) -> EventsByDate {
    let mut next = events.clone();
    if let Some(list) = next.get_mut(date_key) {
        list.retain(|e| e.id != event_id);
        if list.is_empty() {
            next.remove(date_key);
        }
    }
    next
}

fn without_id(events: &EventsByDate, event_id: &str) -> EventsByDate {
    events
        .iter()
        .filter_map(|(key, list)| {
            let kept: Vec<Event> = list.iter().filter(|e| e.id != event_id).cloned().collect();
            (!kept.is_empty()).then(|| (key.clone(), kept))
        })
        .collect()
}
