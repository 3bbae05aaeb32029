use anyhow::Result;
use chrono::Local;
use dialoguer::{Confirm, Input, Select};
use famcal_core::date_key::to_day_key;
use famcal_core::event::{EventColor, EventDraft};
use famcal_core::DayKey;
use owo_colors::OwoColorize;

use crate::commands::print_toast;
use crate::context::{self, Service};
use crate::render::Render;

/// Form fields given on the command line.
#[derive(Debug, Default)]
pub struct Fields {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub all_day: bool,
    pub notes: Option<String>,
    pub color: Option<String>,
}

impl Fields {
    /// Copy the given fields onto `draft`, leaving the rest as they are.
    pub fn apply(self, draft: &mut EventDraft) -> Result<()> {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(date) = self.date {
            draft.date_key = DayKey::parse(&date)?;
        }
        if self.all_day {
            draft.all_day = true;
        } else if let Some(time) = self.time {
            draft.all_day = false;
            draft.time = time;
        }
        if let Some(notes) = self.notes {
            draft.notes = notes;
        }
        if let Some(color) = self.color {
            draft.color = color.parse()?;
        }
        Ok(())
    }
}

pub async fn run(fields: Fields) -> Result<()> {
    let interactive = fields.title.is_none();
    let mut ctx = context::open().await?;

    let today = to_day_key(Local::now().date_naive());
    let draft = ctx.service.open_add(today);
    fields.apply(draft)?;

    if interactive {
        prompt_form(draft)?;
    }

    save(&mut ctx.service).await
}

/// Submit the open form and report the outcome.
pub async fn save(service: &mut Service) -> Result<()> {
    match service.submit().await {
        Ok((date_key, event)) => {
            print_toast(service);
            println!("  {}  {}", date_key, event.render());
            Ok(())
        }
        Err(e) => {
            if let Some(message) = service.toast() {
                eprintln!("{}", format!("  {}", message).red());
            }
            Err(e.into())
        }
    }
}

/// Ask for each field, offering the current value as the default.
pub fn prompt_form(draft: &mut EventDraft) -> Result<()> {
    draft.title = Input::new()
        .with_prompt("  Title")
        .with_initial_text(draft.title.clone())
        .interact_text()?;

    draft.date_key = loop {
        let input: String = Input::new()
            .with_prompt("  Date")
            .default(draft.date_key.to_string())
            .interact_text()?;
        match DayKey::parse(&input) {
            Ok(key) => break key,
            Err(e) => eprintln!("  {}", e.to_string().red()),
        }
    };

    draft.all_day = Confirm::new()
        .with_prompt("  All day?")
        .default(draft.all_day)
        .interact()?;

    if !draft.all_day {
        draft.time = Input::new()
            .with_prompt("  Time (HH:MM)")
            .default(draft.time.clone())
            .interact_text()?;
    }

    draft.notes = Input::new()
        .with_prompt("  Notes (skip)")
        .with_initial_text(draft.notes.clone())
        .allow_empty(true)
        .interact_text()?;

    let labels: Vec<String> = EventColor::ALL.iter().map(|c| c.render()).collect();
    let current = EventColor::ALL.iter().position(|c| *c == draft.color).unwrap_or(0);
    let selection = Select::new()
        .with_prompt("  Color")
        .items(&labels)
        .default(current)
        .interact()?;
    draft.color = EventColor::ALL[selection];

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> EventDraft {
        EventDraft::new(DayKey::parse("2025-06-15").unwrap())
    }

    #[test]
    fn apply_sets_only_given_fields() {
        let mut d = draft();
        Fields {
            title: Some("회의".into()),
            time: Some("14:00".into()),
            ..Default::default()
        }
        .apply(&mut d)
        .unwrap();

        assert_eq!(d.title, "회의");
        assert_eq!(d.time, "14:00");
        assert_eq!(d.date_key.as_str(), "2025-06-15");
        assert_eq!(d.color, EventColor::None);
    }

    #[test]
    fn all_day_wins_over_time() {
        let mut d = draft();
        Fields {
            all_day: true,
            time: Some("14:00".into()),
            ..Default::default()
        }
        .apply(&mut d)
        .unwrap();
        assert!(d.all_day);
        assert_eq!(d.time, "09:00");
    }

    #[test]
    fn rejects_bad_date_and_color() {
        let mut d = draft();
        let bad_date = Fields {
            date: Some("2025-02-30".into()),
            ..Default::default()
        };
        assert!(bad_date.apply(&mut d).is_err());

        let bad_color = Fields {
            color: Some("magenta".into()),
            ..Default::default()
        };
        assert!(bad_color.apply(&mut d).is_err());
    }
}
