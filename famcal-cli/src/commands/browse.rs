//! Line-based pager over the sliding month window.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use famcal_core::MonthKey;
use famcal_core::month_window::{MonthDescriptor, header_label};
use famcal_core::scroll::{FocusOutcome, PendingAnchor, Phase, ScrollController, ScrollHost};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::{self, Service};
use crate::render::month_lines;

/// Where the pager gets month blocks from.
trait MonthSource {
    /// Load whatever `render` needs for a window covering `years`.
    async fn load_years(&mut self, years: &[i32]);

    fn render(&self, month: &MonthDescriptor) -> Vec<String>;
}

/// Months drawn from the calendar service, with holidays fetched per year.
struct ServiceSource<'a> {
    service: &'a mut Service,
    today: NaiveDate,
}

impl MonthSource for ServiceSource<'_> {
    async fn load_years(&mut self, years: &[i32]) {
        self.service.refresh_holidays(years).await;
    }

    fn render(&self, month: &MonthDescriptor) -> Vec<String> {
        month_lines(month, self.service.store(), self.service.holidays(), self.today)
    }
}

/// Months stacked top to bottom as terminal lines.
struct TerminalHost {
    lines: Vec<String>,
    /// Month key, first line, line count.
    layout: Vec<(MonthKey, usize, usize)>,
    /// Anchor and start offset the layout was built from.
    laid_out: Option<(NaiveDate, i32)>,
    scroll_top: usize,
    viewport: usize,
}

impl TerminalHost {
    fn new(viewport: usize) -> Self {
        TerminalHost {
            lines: Vec::new(),
            layout: Vec::new(),
            laid_out: None,
            scroll_top: 0,
            viewport: viewport.max(1),
        }
    }

    /// Lay out the controller's window if it changed since the last layout,
    /// loading the window's years from `source` first.
    async fn sync_layout<S: MonthSource>(&mut self, controller: &ScrollController, source: &mut S) {
        let window = controller.window();
        let identity = (window.anchor, window.start_offset);
        if self.laid_out == Some(identity) {
            return;
        }

        source.load_years(&window.years()).await;

        self.lines.clear();
        self.layout.clear();
        for month in &window.months {
            let mut block = source.render(month);
            block.push(String::new());
            self.layout.push((month.key.clone(), self.lines.len(), block.len()));
            self.lines.extend(block);
        }
        self.laid_out = Some(identity);
        self.scroll_top = self.scroll_top.min(self.max_top());
    }

    fn max_top(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport)
    }

    fn scroll_by(&mut self, delta: isize) {
        let next = self.scroll_top.saturating_add_signed(delta);
        self.scroll_top = next.min(self.max_top());
    }

    fn visible(&self) -> &[String] {
        let end = (self.scroll_top + self.viewport).min(self.lines.len());
        &self.lines[self.scroll_top.min(end)..end]
    }

    fn block(&self, key: &MonthKey) -> Option<(usize, usize)> {
        self.layout
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, top, height)| (*top, *height))
    }
}

impl ScrollHost for TerminalHost {
    fn scroll_top(&self) -> f64 {
        self.scroll_top as f64
    }

    fn viewport_height(&self) -> f64 {
        self.viewport as f64
    }

    fn month_top(&self, key: &MonthKey) -> Option<f64> {
        self.block(key).map(|(top, _)| top as f64)
    }

    fn month_height(&self, key: &MonthKey) -> Option<f64> {
        self.block(key).map(|(_, height)| height as f64)
    }

    fn scroll_to(&mut self, top: f64) {
        self.scroll_top = (top.max(0.0).round() as usize).min(self.max_top());
    }
}

/// Scroll by `delta` lines and let the controller react, completing any
/// window shift. Returns the anchor that was restored, if the window shifted.
async fn advance<S: MonthSource>(
    controller: &mut ScrollController,
    host: &mut TerminalHost,
    delta: isize,
    source: &mut S,
) -> Option<PendingAnchor> {
    host.scroll_by(delta);
    if controller.on_scroll() {
        controller.on_frame(host);
    }

    let pending = match controller.phase() {
        Phase::Recentering(pending) => Some(pending.clone()),
        _ => None,
    };

    host.sync_layout(controller, source).await;
    controller.on_window_rendered(host);
    pending
}

async fn settle<S: MonthSource>(controller: &mut ScrollController, host: &mut TerminalHost, source: &mut S) {
    host.sync_layout(controller, source).await;
    if controller.settle(host).await == FocusOutcome::GaveUp {
        tracing::warn!("could not find today's month in the layout");
    }
}

pub async fn run(height: usize) -> Result<()> {
    let mut ctx = context::open().await?;
    let today = Local::now().date_naive();

    let mut controller = ScrollController::new(today)?;
    let mut source = ServiceSource {
        service: &mut ctx.service,
        today,
    };

    let mut host = TerminalHost::new(height);
    settle(&mut controller, &mut host, &mut source).await;

    let step = (height / 2).max(1) as isize;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\x1b[2J\x1b[H");
        for line in host.visible() {
            println!("{}", line);
        }
        let label = controller
            .active_month()
            .to_date()
            .map(header_label)
            .unwrap_or_default();
        println!(
            "{}",
            format!("[{}]  j/enter: down  k: up  t: today  q: quit", label).dimmed()
        );

        let Some(command) = input.next_line().await? else {
            break;
        };

        controller.set_anchor(Local::now().date_naive());
        host.sync_layout(&controller, &mut source).await;

        match command.trim() {
            "q" => break,
            "t" => {
                controller.request_today();
                settle(&mut controller, &mut host, &mut source).await;
            }
            "k" => {
                advance(&mut controller, &mut host, -step, &mut source).await;
            }
            _ => {
                advance(&mut controller, &mut host, step, &mut source).await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Title lines only; remembers which years were loaded.
    #[derive(Default)]
    struct Plain {
        loaded: Vec<i32>,
    }

    impl MonthSource for Plain {
        async fn load_years(&mut self, years: &[i32]) {
            for year in years {
                if !self.loaded.contains(year) {
                    self.loaded.push(*year);
                }
            }
        }

        fn render(&self, month: &MonthDescriptor) -> Vec<String> {
            std::iter::repeat_n(month.title.clone(), month.weeks.len() + 2).collect()
        }
    }

    async fn settled(today: NaiveDate, viewport: usize) -> (ScrollController, TerminalHost, Plain) {
        let mut controller = ScrollController::new(today).unwrap();
        let mut host = TerminalHost::new(viewport);
        let mut plain = Plain::default();
        settle(&mut controller, &mut host, &mut plain).await;
        (controller, host, plain)
    }

    #[tokio::test]
    async fn settles_on_todays_month() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (controller, host, plain) = settled(today, 20).await;

        assert_eq!(controller.phase(), &Phase::Tracking);
        assert_eq!(controller.active_month().as_str(), "2025-06");

        let (top, _) = host.block(controller.active_month()).unwrap();
        assert!(host.scroll_top <= top && top < host.scroll_top + host.viewport);
        assert_eq!(plain.loaded, vec![2024, 2025, 2026]);
    }

    #[tokio::test]
    async fn window_shift_keeps_active_month_in_place() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (mut controller, mut host, mut plain) = settled(today, 20).await;
        let start = controller.window().start_offset;

        let mut shifts = 0;
        for _ in 0..80 {
            if let Some(pending) = advance(&mut controller, &mut host, 7, &mut plain).await {
                let top = host.month_top(&pending.key).unwrap();
                assert_eq!(top - host.scroll_top(), pending.relative_top);
                assert_eq!(controller.active_month(), &pending.key);
                shifts += 1;
            }
        }

        assert!(shifts > 0);
        assert!(controller.window().start_offset > start);
        assert_eq!(controller.phase(), &Phase::Tracking);
    }

    #[tokio::test]
    async fn today_returns_after_scrolling_away() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (mut controller, mut host, mut plain) = settled(today, 20).await;

        for _ in 0..40 {
            advance(&mut controller, &mut host, -7, &mut plain).await;
        }
        assert_ne!(controller.active_month().as_str(), "2025-06");

        controller.request_today();
        settle(&mut controller, &mut host, &mut plain).await;
        assert_eq!(controller.active_month().as_str(), "2025-06");
        assert_eq!(controller.window().start_offset, -12);
    }

    #[tokio::test]
    async fn scrolling_into_new_year_loads_it() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (mut controller, mut host, mut plain) = settled(today, 20).await;
        assert!(!plain.loaded.contains(&2027));

        for _ in 0..200 {
            if controller.window().years().contains(&2027) {
                break;
            }
            advance(&mut controller, &mut host, 7, &mut plain).await;
        }

        assert!(plain.loaded.contains(&2027));
        for year in controller.window().years() {
            assert!(plain.loaded.contains(&year));
        }
    }

    #[test]
    fn scrolling_clamps_to_content() {
        let mut host = TerminalHost::new(10);
        host.lines = vec![String::new(); 25];
        host.scroll_by(-5);
        assert_eq!(host.scroll_top, 0);
        host.scroll_by(100);
        assert_eq!(host.scroll_top, 15);
        assert_eq!(host.visible().len(), 10);
    }
}
