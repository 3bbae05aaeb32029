use anyhow::Result;
use chrono::Local;
use famcal_core::date_key::to_day_key;
use famcal_core::DayKey;

use crate::context;
use crate::render::{render_day, render_detail};

pub async fn run(date: Option<&str>, id: Option<&str>) -> Result<()> {
    let mut ctx = context::open().await?;
    let service = &mut ctx.service;

    if let Some(id) = id {
        let (date_key, event) = service.select(id)?;
        for line in render_detail(date_key, event) {
            println!("{}", line);
        }
        return Ok(());
    }

    let date_key = match date {
        Some(date) => DayKey::parse(date)?,
        None => to_day_key(Local::now().date_naive()),
    };

    let holiday = service.holidays().name(&date_key);
    for line in render_day(&date_key, service.store().on(&date_key), holiday) {
        println!("{}", line);
    }

    Ok(())
}
