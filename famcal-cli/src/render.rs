//! Terminal rendering for famcal types.
//!
//! Extension traits and helpers that add colored output to famcal-core
//! types using owo_colors.

use chrono::NaiveDate;
use famcal_core::DayKey;
use famcal_core::event::{Event, EventColor};
use famcal_core::holiday::HolidayOverlay;
use famcal_core::month_window::{DayTone, MonthDescriptor, day_tone};
use famcal_core::store::EventStore;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for EventColor {
    fn render(&self) -> String {
        let label = self.swatch().label;
        match self {
            EventColor::None => label.dimmed().to_string(),
            EventColor::Red => label.red().to_string(),
            EventColor::Orange => label.yellow().to_string(),
            EventColor::Green => label.green().to_string(),
            EventColor::Blue => label.blue().to_string(),
            EventColor::Purple => label.magenta().to_string(),
        }
    }
}

/// Colored bullet for an event's color.
fn dot(color: EventColor) -> String {
    match color {
        EventColor::None => "•".dimmed().to_string(),
        EventColor::Red => "•".red().to_string(),
        EventColor::Orange => "•".yellow().to_string(),
        EventColor::Green => "•".green().to_string(),
        EventColor::Blue => "•".blue().to_string(),
        EventColor::Purple => "•".magenta().to_string(),
    }
}

impl Render for Event {
    fn render(&self) -> String {
        format!("{} {:>5}  {}", dot(self.color), self.time.to_string(), self.title)
    }
}

/// Full detail view of one event.
pub fn render_detail(date_key: &DayKey, event: &Event) -> Vec<String> {
    let notes = event.user_notes();
    vec![
        format!("{} {}", dot(event.color), event.title.bold()),
        format!("   {}  {}", date_key, event.time),
        format!("   {}", event.color.render()),
        format!(
            "   {}",
            if notes.is_empty() {
                event.notes.dimmed().to_string()
            } else {
                notes.to_string()
            }
        ),
        format!("   {}", event.id.dimmed()),
    ]
}

/// Events and holiday for one day.
pub fn render_day(date_key: &DayKey, events: &[Event], holiday: Option<&str>) -> Vec<String> {
    let mut lines = vec![date_key.to_string().bold().to_string()];

    if let Some(name) = holiday {
        lines.push(format!("   {}", name.red()));
    }

    if events.is_empty() && holiday.is_none() {
        lines.push("   No events".dimmed().to_string());
    }

    lines.extend(events.iter().map(|e| format!("   {}", e.render())));
    lines
}

/// Width of one day cell, including the separating space.
const CELL_WIDTH: usize = 4;

fn render_cell(
    date: NaiveDate,
    day_number: u32,
    has_events: bool,
    is_holiday: bool,
    is_today: bool,
) -> String {
    let number = format!("{:>2}", day_number);
    let number = match day_tone(date, is_holiday) {
        DayTone::Sun => number.red().to_string(),
        DayTone::Sat => number.blue().to_string(),
        DayTone::Weekday => number,
    };
    let number = if is_today {
        number.reversed().to_string()
    } else {
        number
    };

    let marker = if has_events { "•" } else { " " };
    format!("{}{} ", number, marker)
}

/// A month as terminal lines: title, weekday header, one line per week.
pub fn month_lines(
    month: &MonthDescriptor,
    store: &EventStore,
    holidays: &HolidayOverlay,
    today: NaiveDate,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(month.weeks.len() + 2);
    lines.push(month.title.bold().to_string());
    lines.push(format!(
        "{}{}{}{}{}{}{}",
        " Su ".red(),
        " Mo ",
        " Tu ",
        " We ",
        " Th ",
        " Fr ",
        " Sa ".blue()
    ));

    for week in &month.weeks {
        let line: String = week
            .iter()
            .map(|slot| match slot {
                Some(day) => render_cell(
                    day.date,
                    day.day_number,
                    !store.on(&day.key).is_empty(),
                    holidays.is_holiday(&day.key),
                    day.date == today,
                ),
                None => " ".repeat(CELL_WIDTH),
            })
            .collect();
        lines.push(line);
    }

    lines
}

/// Month grid followed by the month's holidays and events.
pub fn month_with_agenda(
    month: &MonthDescriptor,
    store: &EventStore,
    holidays: &HolidayOverlay,
    today: NaiveDate,
) -> Vec<String> {
    let mut lines = month_lines(month, store, holidays, today);

    let agenda: Vec<String> = month
        .days()
        .filter_map(|day| {
            let events = store.on(&day.key);
            let holiday = holidays.name(&day.key);
            if events.is_empty() && holiday.is_none() {
                return None;
            }
            Some(render_day(&day.key, events, holiday).join("\n"))
        })
        .collect();

    if !agenda.is_empty() {
        lines.push(String::new());
        lines.extend(agenda);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use famcal_core::event::EventTime;

    #[test]
    fn month_lines_have_title_header_and_weeks() {
        // June 2025 starts on a Sunday and spans five week rows.
        let anchor = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let month = MonthDescriptor::build(anchor, 0).unwrap();
        let lines = month_lines(&month, &EventStore::in_memory(), &HolidayOverlay::new(None), anchor);
        assert_eq!(lines.len(), 2 + 5);
    }

    #[test]
    fn empty_day_says_so() {
        let key = DayKey::parse("2025-06-15").unwrap();
        let lines = render_day(&key, &[], None);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("No events"));
    }

    #[test]
    fn event_line_shows_time_and_title() {
        let event = Event {
            id: "a".into(),
            time: EventTime::parse("14:00").unwrap(),
            title: "회의".into(),
            notes: String::new(),
            color: EventColor::Green,
        };
        let line = event.render();
        assert!(line.contains("14:00"));
        assert!(line.ends_with("회의"));
    }
}
