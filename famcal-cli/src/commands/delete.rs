use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::commands::print_toast;
use crate::context;
use crate::render::render_detail;

pub async fn run(id: &str, yes: bool) -> Result<()> {
    let mut ctx = context::open().await?;
    let service = &mut ctx.service;

    let (date_key, event) = service.select(id)?;
    for line in render_detail(date_key, event) {
        println!("{}", line);
    }
    println!();

    let title = service.request_delete()?.title.clone();

    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!("  Delete \"{}\"?", title))
            .default(false)
            .interact()?;

    if !confirmed {
        service.cancel_delete();
        println!("{}", "  Kept.".dimmed());
        return Ok(());
    }

    match service.confirm_delete().await {
        Ok(_) => {
            print_toast(service);
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
