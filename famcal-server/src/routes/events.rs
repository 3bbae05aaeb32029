//! Event endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use famcal_core::date_key::DayKey;
use famcal_core::event::{Event, EventColor, EventDraft};
use famcal_core::store::EventsByDate;
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::{AppState, Service};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

#[derive(Deserialize)]
pub struct EventsQuery {
    /// Only this day (YYYY-MM-DD)
    pub date: Option<String>,
}

/// GET /events - All events by day, or one day's events
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsByDate>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let store = calendar.service()?.store();

    let events = match query.date.as_deref() {
        Some(date) => {
            let key = DayKey::parse(date)?;
            let mut day = EventsByDate::new();
            if !store.on(&key).is_empty() {
                day.insert(key.clone(), store.on(&key).to_vec());
            }
            day
        }
        None => store.events().clone(),
    };

    Ok(Json(events))
}

/// An event together with the day it is filed under
#[derive(Serialize)]
pub struct EventDetail {
    pub date_key: DayKey,
    pub event: Event,
    /// Notification to show after a change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
}

/// GET /events/:id - Detail of one event
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventDetail>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;
    let (date_key, event) = service.select(&id)?;

    Ok(Json(EventDetail {
        date_key: date_key.clone(),
        event: event.clone(),
        toast: None,
    }))
}

/// Request body for creating or editing an event
#[derive(Deserialize)]
pub struct EventRequest {
    pub title: String,
    pub date: DayKey,
    #[serde(default)]
    pub all_day: bool,
    pub time: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub color: EventColor,
}

impl EventRequest {
    fn fill(self, draft: &mut EventDraft) {
        draft.title = self.title;
        draft.date_key = self.date;
        draft.all_day = self.all_day;
        if let Some(time) = self.time {
            draft.time = time;
        }
        draft.notes = self.notes;
        draft.color = self.color;
    }
}

/// Save the open form. A rejected form is discarded; each request carries
/// the whole event.
async fn submit(service: &mut Service) -> Result<Json<EventDetail>, AppError> {
    let (date_key, event) = match service.submit().await {
        Ok(saved) => saved,
        Err(e) => {
            service.close_form();
            return Err(e.into());
        }
    };

    Ok(Json(EventDetail {
        date_key,
        event,
        toast: service.toast().map(str::to_string),
    }))
}

/// POST /events - Create an event
async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventDetail>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;

    let draft = service.open_add(request.date.clone());
    request.fill(draft);
    submit(service).await
}

/// PUT /events/:id - Edit an event, possibly moving it to another day
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventDetail>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;

    let draft = service.open_edit(&id)?;
    request.fill(draft);
    submit(service).await
}

/// DELETE /events/:id - Delete an event
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventDetail>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;

    let date_key = service.select(&id)?.0.clone();
    service.request_delete()?;
    let event = service.confirm_delete().await?;

    Ok(Json(EventDetail {
        date_key,
        event,
        toast: service.toast().map(str::to_string),
    }))
}
