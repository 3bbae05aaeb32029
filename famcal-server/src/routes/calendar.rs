//! Month window, holidays, sync and status endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::{Datelike, Local};
use famcal_core::constants::WINDOW_CENTER_INDEX;
use famcal_core::date_key::DayKey;
use famcal_core::holiday::HolidaysByDate;
use famcal_core::month_window::MonthWindow;
use famcal_core::remote::session::AuthStatus;
use famcal_core::store::EventsByDate;
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/window", get(window))
        .route("/holidays", get(holidays))
        .route("/sync", post(sync))
}

/// GET /status - Where the session stands with respect to signing in
async fn status(State(state): State<AppState>) -> Json<AuthStatus> {
    Json(state.calendar.lock().await.status.clone())
}

#[derive(Deserialize)]
pub struct WindowQuery {
    /// Any day in the anchor month (YYYY-MM-DD), defaults to today
    pub anchor: Option<String>,
    /// Offset of the first month from the anchor, defaults to centering it
    pub start_offset: Option<i32>,
}

/// Month window plus everything needed to draw it
#[derive(Serialize)]
pub struct WindowResponse {
    pub window: MonthWindow,
    pub events: EventsByDate,
    pub holidays: HolidaysByDate,
}

/// GET /window - The 24 months to render, with their events and holidays
async fn window(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<WindowResponse>, AppError> {
    let anchor = match query.anchor.as_deref() {
        Some(day) => DayKey::parse(day)?.to_date()?,
        None => Local::now().date_naive(),
    };
    let start_offset = query.start_offset.unwrap_or(-(WINDOW_CENTER_INDEX as i32));
    let window = MonthWindow::build(anchor, start_offset)?;

    state.load_holidays(&window.years()).await?;

    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;

    let first = window.months.first().map(|m| DayKey::from_date(m.first_day));
    let last = window
        .months
        .last()
        .and_then(|m| m.days().last())
        .map(|d| d.key.clone());

    let (events, holidays) = match (first, last) {
        (Some(first), Some(last)) => (
            service
                .store()
                .events()
                .range(first.clone()..=last.clone())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            service
                .holidays()
                .all()
                .range(first..=last)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        _ => (EventsByDate::new(), HolidaysByDate::new()),
    };

    Ok(Json(WindowResponse {
        window,
        events,
        holidays,
    }))
}

#[derive(Deserialize)]
pub struct HolidayQuery {
    pub year: Option<i32>,
}

/// GET /holidays?year=YYYY - Holidays for one year
async fn holidays(
    State(state): State<AppState>,
    Query(query): Query<HolidayQuery>,
) -> Result<Json<HolidaysByDate>, AppError> {
    let year = query.year.unwrap_or_else(|| Local::now().year());

    state.load_holidays(&[year]).await?;

    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;

    let prefix = format!("{:04}-", year);
    let holidays = service
        .holidays()
        .all()
        .iter()
        .filter(|(key, _)| key.as_str().starts_with(&prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Json(holidays))
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub events: usize,
}

/// POST /sync - Replace local events with the backend's copy
async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, AppError> {
    let mut calendar = state.calendar.lock().await;
    let service = calendar.service()?;
    service.refresh().await?;

    Ok(Json(SyncResponse {
        events: service.store().len(),
    }))
}
