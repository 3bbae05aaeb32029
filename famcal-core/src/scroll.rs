//! Infinite-scroll controller for the sliding month window.
//!
//! The controller owns the window and the active month and moves between
//! three phases:
//!
//! - `Settling`: the window was reset around today's month and we are waiting
//!   for that month to be laid out so it can be scrolled into view.
//! - `Tracking`: scroll position decides the active month. When the active
//!   month drifts within `WINDOW_SHIFT_EDGE` of either end of the window, the
//!   window is shifted so the active month sits at `WINDOW_CENTER_INDEX`.
//! - `Recentering`: the window just shifted. Once the host has laid out the new
//!   months, `on_window_rendered` restores the active month to the on-screen
//!   offset it had before the shift, then tracking resumes.
//!
//! Geometry comes from a `ScrollHost`, so the same logic drives a browser
//! DOM, a terminal pager or a test double.

use chrono::NaiveDate;

use crate::constants::{
    DEFAULT_ANCHOR_OFFSET, FOCUS_LINE_RATIO, WINDOW_CENTER_INDEX, WINDOW_MONTH_COUNT,
    WINDOW_SHIFT_EDGE,
};
use crate::date_key::{MonthKey, first_of_month, month_offset};
use crate::error::FamcalResult;
use crate::month_window::MonthWindow;
use crate::retry::{CancelToken, RetryOutcome, RetryPolicy, retry};

/// Scroll geometry of whatever is displaying the window.
pub trait ScrollHost {
    /// Current scroll offset of the scroll area.
    fn scroll_top(&self) -> f64;

    fn viewport_height(&self) -> f64;

    /// Top of the month's block within the scroll content, if it is laid out.
    fn month_top(&self, key: &MonthKey) -> Option<f64>;

    fn month_height(&self, key: &MonthKey) -> Option<f64>;

    fn scroll_to(&mut self, top: f64);
}

/// Where the active month sat on screen right before a window shift.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAnchor {
    pub key: MonthKey,
    pub relative_top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Settling,
    Tracking,
    Recentering(PendingAnchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Today's month was found and scrolled into view.
    Focused,
    /// The month never showed up; tracking resumes anyway.
    GaveUp,
    /// A newer settle request took over.
    Superseded,
}

pub struct ScrollController {
    anchor: NaiveDate,
    window: MonthWindow,
    active: MonthKey,
    phase: Phase,
    frame_requested: bool,
    settle_token: CancelToken,
    settle_policy: RetryPolicy,
}

impl ScrollController {
    /// Controller centered on the month containing `today`, in `Settling`.
    pub fn new(today: NaiveDate) -> FamcalResult<Self> {
        let anchor = first_of_month(today);
        Ok(ScrollController {
            anchor,
            window: MonthWindow::build(anchor, -(WINDOW_CENTER_INDEX as i32))?,
            active: MonthKey::from_date(anchor),
            phase: Phase::Settling,
            frame_requested: false,
            settle_token: CancelToken::new(),
            settle_policy: RetryPolicy::default(),
        })
    }

    pub fn with_settle_policy(mut self, policy: RetryPolicy) -> Self {
        self.settle_policy = policy;
        self
    }

    pub fn window(&self) -> &MonthWindow {
        &self.window
    }

    pub fn active_month(&self) -> &MonthKey {
        &self.active
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Token that cancels the settle currently in flight.
    pub fn settle_handle(&self) -> CancelToken {
        self.settle_token.clone()
    }

    /// Jump back to today: reset the window around the anchor month and enter
    /// `Settling`. Any in-flight settle or pending anchor restore is abandoned.
    pub fn request_today(&mut self) -> CancelToken {
        self.settle_token.cancel();
        self.settle_token = CancelToken::new();

        self.rebuild(-(WINDOW_CENTER_INDEX as i32));
        self.active = MonthKey::from_date(self.anchor);
        self.phase = Phase::Settling;
        self.frame_requested = false;

        tracing::debug!(anchor = %self.active, "settling on today");
        self.settle_token.clone()
    }

    /// The host became visible again after being hidden.
    pub fn on_visibility_change(&mut self, visible: bool) -> Option<CancelToken> {
        visible.then(|| self.request_today())
    }

    /// Scroll today's month into view, polling the host until it is laid out.
    pub async fn settle<H: ScrollHost>(&mut self, host: &mut H) -> FocusOutcome {
        let token = self.settle_token.clone();
        let policy = self.settle_policy;

        let outcome = retry(&policy, &token, |_| self.focus_anchor(host)).await;

        match outcome {
            RetryOutcome::Ready(()) => FocusOutcome::Focused,
            RetryOutcome::Exhausted => {
                tracing::warn!(month = %self.active, "today's month never rendered, giving up");
                self.finish_settling();
                FocusOutcome::GaveUp
            }
            RetryOutcome::Cancelled => FocusOutcome::Superseded,
        }
    }

    /// Record a scroll event. Returns true when the caller should schedule a
    /// frame; further scrolls before that frame are coalesced.
    pub fn on_scroll(&mut self) -> bool {
        if self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    /// Animation frame after one or more scroll events.
    pub fn on_frame<H: ScrollHost>(&mut self, host: &H) {
        self.frame_requested = false;
        self.evaluate(host);
    }

    pub fn on_resize<H: ScrollHost>(&mut self, host: &H) {
        self.evaluate(host);
    }

    /// The host has laid out the current window. Completes a pending recenter.
    pub fn on_window_rendered<H: ScrollHost>(&mut self, host: &mut H) {
        let Phase::Recentering(pending) = &self.phase else {
            return;
        };

        match host.month_top(&pending.key) {
            Some(top) => host.scroll_to((top - pending.relative_top).max(0.0)),
            None => tracing::debug!(month = %pending.key, "anchor month missing after shift"),
        }

        self.phase = Phase::Tracking;
    }

    /// Move the anchor (e.g. the date rolled over). The window keeps its
    /// offset relative to the new anchor; if the active month falls out of it,
    /// the window is rebuilt around the active month without touching scroll.
    pub fn set_anchor(&mut self, today: NaiveDate) {
        let anchor = first_of_month(today);
        if anchor == self.anchor {
            return;
        }
        self.anchor = anchor;
        self.rebuild(self.window.start_offset);

        if self.window.index_of(&self.active).is_none() {
            self.center_on_active();
        }
    }

    fn evaluate<H: ScrollHost>(&mut self, host: &H) {
        if self.phase != Phase::Tracking {
            return;
        }

        let next = self.scan_active(host);
        if next != self.active {
            tracing::trace!(from = %self.active, to = %next, "active month changed");
            self.active = next;
        }

        self.maybe_recenter(host);
    }

    /// Last month whose top is at or above the focus line.
    fn scan_active<H: ScrollHost>(&self, host: &H) -> MonthKey {
        let focus_y = host.scroll_top() + host.viewport_height() * FOCUS_LINE_RATIO;

        let mut next = self
            .window
            .first_key()
            .cloned()
            .unwrap_or_else(|| MonthKey::from_date(self.anchor));

        for month in &self.window.months {
            let Some(top) = host.month_top(&month.key) else {
                continue;
            };
            if focus_y >= top {
                next = month.key.clone();
            } else {
                break;
            }
        }

        next
    }

    fn maybe_recenter<H: ScrollHost>(&mut self, host: &H) {
        let Some(index) = self.window.index_of(&self.active) else {
            self.center_on_active();
            return;
        };

        let near_top = index <= WINDOW_SHIFT_EDGE;
        let near_bottom = index >= WINDOW_MONTH_COUNT - WINDOW_SHIFT_EDGE - 1;
        if !near_top && !near_bottom {
            return;
        }

        let delta = index as i32 - WINDOW_CENTER_INDEX as i32;
        if delta == 0 {
            return;
        }

        let relative_top = host
            .month_top(&self.active)
            .map(|top| top - host.scroll_top())
            .unwrap_or(DEFAULT_ANCHOR_OFFSET);

        if !self.rebuild(self.window.start_offset + delta) {
            return;
        }

        tracing::debug!(month = %self.active, index, delta, "recentering window");
        self.phase = Phase::Recentering(PendingAnchor {
            key: self.active.clone(),
            relative_top,
        });
    }

    fn center_on_active(&mut self) {
        let Ok(active_date) = self.active.to_date() else {
            return;
        };
        let offset = month_offset(self.anchor, active_date) - WINDOW_CENTER_INDEX as i32;
        self.rebuild(offset);
    }

    fn focus_anchor<H: ScrollHost>(&mut self, host: &mut H) -> Option<()> {
        let key = MonthKey::from_date(self.anchor);
        let top = host.month_top(&key)?;
        let height = host.month_height(&key).unwrap_or(0.0);

        let target = (top - host.viewport_height() / 2.0 + height / 2.0).max(0.0);
        host.scroll_to(target);

        self.active = key;
        self.finish_settling();
        Some(())
    }

    fn finish_settling(&mut self) {
        if self.phase == Phase::Settling {
            self.phase = Phase::Tracking;
        }
    }

    /// Swap in the window at `start_offset`. Returns false, keeping the
    /// current window, when that window cannot be built.
    fn rebuild(&mut self, start_offset: i32) -> bool {
        if start_offset == self.window.start_offset && self.window.anchor == self.anchor {
            return true;
        }

        match MonthWindow::build(self.anchor, start_offset) {
            Ok(window) => {
                self.window = window;
                true
            }
            Err(e) => {
                tracing::warn!(start_offset, error = %e, "window shift out of range");
                false
            }
        }
    }
}

impl Drop for ScrollController {
    fn drop(&mut self) {
        self.settle_token.cancel();
    }
}
