//! Shared constants.

/// Number of months kept resident in the sliding window.
pub const WINDOW_MONTH_COUNT: usize = 24;

/// Index the active month is moved to when the window recenters.
pub const WINDOW_CENTER_INDEX: usize = 12;

/// Distance from either window edge that triggers a recenter.
pub const WINDOW_SHIFT_EDGE: usize = 4;

/// Years a day or month key can name; keys always carry a four-digit year.
pub const MIN_KEY_YEAR: i32 = 1;
pub const MAX_KEY_YEAR: i32 = 9999;

/// Fraction of the viewport height, from the top, where the focus line sits.
pub const FOCUS_LINE_RATIO: f64 = 0.28;

/// Fallback on-screen offset used when the active month has no position yet.
pub const DEFAULT_ANCHOR_OFFSET: f64 = 120.0;

/// Time value stored for all-day events.
pub const ALL_DAY_SENTINEL: &str = "종일";

/// Notes value stored when the user left notes empty.
pub const NO_NOTES_SENTINEL: &str = "메모 없음";

/// Time pre-filled in a new draft.
pub const DEFAULT_DRAFT_TIME: &str = "09:00";

/// Name used for holidays whose payload carries no name.
pub const DEFAULT_HOLIDAY_NAME: &str = "공휴일";

/// Title keyword that forces the blue category.
pub const DEADLINE_KEYWORD: &str = "마감";

/// Title keyword that forces the red category (checked after the deadline keyword).
pub const BASICS_KEYWORD: &str = "기초";

/// Columns selected from the remote events relation.
pub const REMOTE_EVENT_COLUMNS: &str = "id,title,start_at,end_at,all_day,notes,color";

pub const EVENTS_FILE: &str = "events.json";
pub const SESSION_FILE: &str = "session.toml";

pub const DEFAULT_TOAST_MILLIS: u64 = 1800;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
