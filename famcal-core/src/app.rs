//! Calendar service: the add/edit form, detail sheet, delete confirmation and
//! toast, on top of the event store and an optional backend.

use std::time::Duration;

use chrono::{Local, TimeZone, Utc};
use tokio::time::Instant;

use crate::constants::DEFAULT_TOAST_MILLIS;
use crate::date_key::DayKey;
use crate::error::{FamcalError, FamcalResult};
use crate::event::{Event, EventDraft, local_event_id};
use crate::holiday::HolidayOverlay;
use crate::remote::EventBackend;
use crate::store::EventStore;
use crate::sync::SyncAdapter;

/// The add/edit form. `editing` names the event being changed, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub draft: EventDraft,
    editing: Option<(DayKey, String)>,
}

impl EventForm {
    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Toast {
    message: String,
    expires_at: Instant,
}

pub struct CalendarService<B, Tz = Local> {
    store: EventStore,
    sync: Option<SyncAdapter<B, Tz>>,
    holidays: HolidayOverlay,
    form: Option<EventForm>,
    selected: Option<String>,
    pending_delete: Option<String>,
    toast: Option<Toast>,
    toast_duration: Duration,
}

impl<B, Tz> CalendarService<B, Tz>
where
    B: EventBackend,
    Tz: TimeZone + Send + Sync,
{
    /// Service that keeps everything in `store` and never talks to a backend.
    pub fn local(store: EventStore, holidays: HolidayOverlay) -> Self {
        Self::build(store, None, holidays)
    }

    pub fn remote(store: EventStore, sync: SyncAdapter<B, Tz>, holidays: HolidayOverlay) -> Self {
        Self::build(store, Some(sync), holidays)
    }

    fn build(store: EventStore, sync: Option<SyncAdapter<B, Tz>>, holidays: HolidayOverlay) -> Self {
        CalendarService {
            store,
            sync,
            holidays,
            form: None,
            selected: None,
            pending_delete: None,
            toast: None,
            toast_duration: Duration::from_millis(DEFAULT_TOAST_MILLIS),
        }
    }

    pub fn with_toast_duration(mut self, duration: Duration) -> Self {
        self.toast_duration = duration;
        self
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn holidays(&self) -> &HolidayOverlay {
        &self.holidays
    }

    pub fn holidays_mut(&mut self) -> &mut HolidayOverlay {
        &mut self.holidays
    }

    pub fn sync(&self) -> Option<&SyncAdapter<B, Tz>> {
        self.sync.as_ref()
    }

    pub fn is_remote(&self) -> bool {
        self.sync.is_some()
    }

    /// Pull the authoritative event set. A no-op in local mode.
    pub async fn refresh(&mut self) -> FamcalResult<()> {
        if let Some(sync) = &self.sync {
            sync.refetch(&mut self.store).await?;
        }
        Ok(())
    }

    /// Wait for remote changes and refetch on each one, until the feed closes.
    pub async fn watch(&mut self) -> FamcalResult<()> {
        let Some(sync) = &self.sync else {
            return Err(FamcalError::NotAuthenticated);
        };
        let mut feed = sync.subscribe()?;
        sync.watch(&mut self.store, &mut feed).await;
        Ok(())
    }

    /// Fetch holidays for `years` not fetched yet, typically `MonthWindow::years()`.
    pub async fn refresh_holidays(&mut self, years: &[i32]) -> usize {
        self.holidays.refresh(years).await
    }

    pub fn open_add(&mut self, date_key: DayKey) -> &mut EventDraft {
        self.selected = None;
        let form = self.form.insert(EventForm {
            draft: EventDraft::new(date_key),
            editing: None,
        });
        &mut form.draft
    }

    /// Open the form pre-filled from an existing event.
    pub fn open_edit(&mut self, event_id: &str) -> FamcalResult<&mut EventDraft> {
        let (date_key, event) = self
            .store
            .find(event_id)
            .ok_or_else(|| FamcalError::EventNotFound(event_id.to_string()))?;

        let draft = EventDraft::from_event(date_key.clone(), event);
        let editing = Some((date_key.clone(), event.id.clone()));

        self.selected = None;
        let form = self.form.insert(EventForm { draft, editing });
        Ok(&mut form.draft)
    }

    pub fn form(&self) -> Option<&EventForm> {
        self.form.as_ref()
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Save the open form and open the detail sheet on the saved event.
    ///
    /// Validation errors keep the form open. A rejected remote write keeps
    /// the form open too, leaves the local map unchanged, and raises a toast.
    pub async fn submit(&mut self) -> FamcalResult<(DayKey, Event)> {
        let form = self
            .form
            .as_ref()
            .ok_or_else(|| FamcalError::Validation("No event form is open".into()))?;
        let resolved = form.draft.resolve()?;
        let editing = form.editing.clone();

        let result = match (&self.sync, editing) {
            (Some(sync), None) => sync.create(&mut self.store, &resolved).await,
            (Some(sync), Some((source, id))) => sync.update(&mut self.store, &source, &id, &resolved).await,
            (None, None) => {
                let date_key = resolved.date_key.clone();
                let id = local_event_id(&date_key, Utc::now().timestamp_millis());
                let event = resolved.into_event(id);
                self.store
                    .upsert(&date_key, event.clone())
                    .map(|()| (date_key, event))
            }
            (None, Some((source, id))) => {
                let date_key = resolved.date_key.clone();
                let event = resolved.into_event(id.clone());
                self.store
                    .move_and_upsert(&source, &date_key, &id, event.clone())
                    .map(|()| (date_key, event))
            }
        };

        match result {
            Ok(saved) => {
                let message = if self.form.as_ref().is_some_and(EventForm::is_edit) {
                    "Event updated"
                } else {
                    "Event added"
                };
                self.form = None;
                self.selected = Some(saved.1.id.clone());
                self.pending_delete = None;
                self.show_toast(message);
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not save event");
                if matches!(e, FamcalError::RemoteWrite(_)) {
                    self.show_toast("Could not save the event. Try again.");
                }
                Err(e)
            }
        }
    }

    /// Open the detail sheet for an event.
    pub fn select(&mut self, event_id: &str) -> FamcalResult<(&DayKey, &Event)> {
        if self.store.find(event_id).is_none() {
            return Err(FamcalError::EventNotFound(event_id.to_string()));
        }
        self.selected = Some(event_id.to_string());
        self.pending_delete = None;
        self.selected_event()
            .ok_or_else(|| FamcalError::EventNotFound(event_id.to_string()))
    }

    pub fn selected_event(&self) -> Option<(&DayKey, &Event)> {
        self.selected.as_deref().and_then(|id| self.store.find(id))
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
        self.pending_delete = None;
    }

    /// First step of deleting the selected event; nothing is removed yet.
    pub fn request_delete(&mut self) -> FamcalResult<&Event> {
        let (_, event) = self
            .selected_event()
            .ok_or_else(|| FamcalError::Validation("No event is selected".into()))?;
        let id = event.id.clone();
        self.pending_delete = Some(id);
        self.selected_event()
            .map(|(_, event)| event)
            .ok_or_else(|| FamcalError::Validation("No event is selected".into()))
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn delete_pending(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Delete the event whose removal was requested.
    ///
    /// In remote mode the backend delete happens first; if it fails the
    /// local map keeps the event.
    pub async fn confirm_delete(&mut self) -> FamcalResult<Event> {
        let id = self
            .pending_delete
            .take()
            .ok_or_else(|| FamcalError::Validation("Deletion was not requested".into()))?;
        let (date_key, event) = self
            .store
            .find(&id)
            .map(|(key, event)| (key.clone(), event.clone()))
            .ok_or_else(|| FamcalError::EventNotFound(id.clone()))?;

        let result = match &self.sync {
            Some(sync) => sync.delete(&mut self.store, &date_key, &id).await,
            None => self.store.remove(&date_key, &id),
        };

        match result {
            Ok(()) => {
                self.selected = None;
                self.show_toast("Event deleted");
                Ok(event)
            }
            Err(e) => {
                tracing::warn!(error = %e, id = %id, "could not delete event");
                if matches!(e, FamcalError::RemoteWrite(_)) {
                    self.show_toast("Could not delete the event. Try again.");
                }
                Err(e)
            }
        }
    }

    pub fn show_toast(&mut self, message: &str) {
        self.toast = Some(Toast {
            message: message.to_string(),
            expires_at: Instant::now() + self.toast_duration,
        });
    }

    /// The current toast message, if it has not expired yet.
    pub fn toast(&self) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.message.as_str())
    }
}
