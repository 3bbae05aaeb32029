use anyhow::Result;
use chrono::{Datelike, Local};
use owo_colors::OwoColorize;

use crate::context;
use crate::utils::tui::create_spinner;

pub async fn run(year: Option<i32>) -> Result<()> {
    let mut ctx = context::open().await?;
    let year = year.unwrap_or_else(|| Local::now().year());

    if ctx.config.holiday_endpoint.is_some() {
        let spinner = create_spinner(format!("Looking up {} holidays...", year));
        ctx.service.refresh_holidays(&[year]).await;
        spinner.finish_and_clear();
    }

    let prefix = format!("{}-", year);
    let holidays: Vec<_> = ctx
        .service
        .holidays()
        .all()
        .iter()
        .filter(|(key, _)| key.as_str().starts_with(&prefix))
        .collect();

    if holidays.is_empty() {
        println!("{}", format!("  No holidays known for {}", year).dimmed());
        return Ok(());
    }

    for (key, name) in holidays {
        println!("  {}  {}", key, name.red());
    }

    Ok(())
}
