//! Core library for famcal.
//!
//! - `date_key` and `month_window` lay out the scrollable month grid
//! - `store` holds events by day and persists them locally
//! - `scroll` keeps the sliding month window centered while scrolling
//! - `remote` and `sync` talk to the hosted backend
//! - `holiday` overlays public holidays
//! - `app` ties these together behind the add/edit/delete flows

pub mod app;
pub mod config;
pub mod constants;
pub mod date_key;
pub mod error;
pub mod event;
pub mod holiday;
pub mod month_window;
pub mod remote;
pub mod retry;
pub mod scroll;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use app::{CalendarService, EventForm};
pub use config::{AppConfig, BackendConfig};
pub use date_key::{DayKey, MonthKey};
pub use error::{FamcalError, FamcalResult};
pub use event::{Event, EventColor, EventDraft, EventTime};
pub use holiday::HolidayOverlay;
pub use month_window::{MonthDescriptor, MonthWindow};
pub use store::{EventStore, EventsByDate};
pub use sync::SyncAdapter;
