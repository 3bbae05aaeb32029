//! Keeps the local event map consistent with the hosted backend.
//!
//! Writes go to the backend first; the local map only changes once the
//! backend has accepted them. Change notices trigger a full refetch that
//! replaces the local map wholesale.

use chrono::{Local, TimeZone};

use crate::date_key::DayKey;
use crate::error::FamcalResult;
use crate::event::{Event, ResolvedDraft};
use crate::remote::{ChangeFeed, EventBackend, draft_to_payload, event_map_from_rows};
use crate::store::{EventStore, EventsByDate};

pub struct SyncAdapter<B, Tz = Local> {
    backend: B,
    tz: Tz,
}

impl<B: EventBackend> SyncAdapter<B, Local> {
    pub fn new(backend: B) -> Self {
        SyncAdapter { backend, tz: Local }
    }
}

impl<B, Tz> SyncAdapter<B, Tz>
where
    B: EventBackend,
    Tz: TimeZone + Send + Sync,
{
    /// Adapter that files events by calendar day in `tz`.
    pub fn with_timezone(backend: B, tz: Tz) -> Self {
        SyncAdapter { backend, tz }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch every remote row and group it by local day.
    pub async fn snapshot(&self) -> FamcalResult<EventsByDate> {
        let rows = self.backend.list_events().await?;
        Ok(event_map_from_rows(&rows, &self.tz))
    }

    /// Replace the local map with the remote snapshot.
    ///
    /// On failure the error is logged and returned; the local map is untouched.
    pub async fn refetch(&self, store: &mut EventStore) -> FamcalResult<usize> {
        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "failed to refetch events");
                return Err(e);
            }
        };

        store.replace_all(snapshot)?;
        tracing::debug!(events = store.len(), "local events replaced from backend");
        Ok(store.len())
    }

    pub async fn create(&self, store: &mut EventStore, draft: &ResolvedDraft) -> FamcalResult<(DayKey, Event)> {
        let payload = draft_to_payload(draft, &self.tz)?;
        let row = self.backend.insert_event(&payload).await?;

        let date_key = row.day_key(&self.tz);
        let event = row.to_event(&self.tz);
        store.upsert(&date_key, event.clone())?;

        tracing::info!(id = %event.id, date = %date_key, "event created");
        Ok((date_key, event))
    }

    pub async fn update(
        &self,
        store: &mut EventStore,
        source: &DayKey,
        event_id: &str,
        draft: &ResolvedDraft,
    ) -> FamcalResult<(DayKey, Event)> {
        let payload = draft_to_payload(draft, &self.tz)?;
        let row = self.backend.update_event(event_id, &payload).await?;

        let date_key = row.day_key(&self.tz);
        let event = row.to_event(&self.tz);
        store.move_and_upsert(source, &date_key, event_id, event.clone())?;

        tracing::info!(id = %event_id, date = %date_key, "event updated");
        Ok((date_key, event))
    }

    pub async fn delete(&self, store: &mut EventStore, date_key: &DayKey, event_id: &str) -> FamcalResult<()> {
        self.backend.delete_event(event_id).await?;
        store.remove(date_key, event_id)?;

        tracing::info!(id = %event_id, date = %date_key, "event deleted");
        Ok(())
    }

    pub fn subscribe(&self) -> FamcalResult<ChangeFeed> {
        self.backend.subscribe()
    }

    /// Refetch on every change notice until the feed closes.
    pub async fn watch(&self, store: &mut EventStore, feed: &mut ChangeFeed) {
        while feed.next().await.is_some() {
            tracing::debug!("remote change notice");
            let _ = self.refetch(store).await;
        }
        tracing::debug!("change feed closed");
    }
}
