use anyhow::Result;
use chrono::{Datelike, Local};
use famcal_core::MonthKey;
use famcal_core::date_key::first_of_month;
use famcal_core::month_window::MonthDescriptor;

use crate::context;
use crate::render::month_with_agenda;

pub async fn run(month: Option<&str>) -> Result<()> {
    let mut ctx = context::open().await?;
    let today = Local::now().date_naive();

    let first_day = match month {
        Some(key) => MonthKey::parse(key)?.to_date()?,
        None => first_of_month(today),
    };

    let descriptor = MonthDescriptor::build(first_day, 0)?;
    ctx.service.refresh_holidays(&[first_day.year()]).await;

    for line in month_with_agenda(&descriptor, ctx.service.store(), ctx.service.holidays(), today) {
        println!("{}", line);
    }

    Ok(())
}
