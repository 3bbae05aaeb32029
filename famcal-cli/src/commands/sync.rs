use anyhow::Result;
use owo_colors::OwoColorize;

use crate::context;
use crate::utils::tui::create_spinner;

pub async fn run() -> Result<()> {
    let mut ctx = context::open().await?;

    if !ctx.service.is_remote() {
        println!("{}", "  Local-only mode, nothing to sync.".dimmed());
        return Ok(());
    }

    let spinner = create_spinner("Syncing...".to_string());
    let result = ctx.service.refresh().await;
    spinner.finish_and_clear();
    result?;

    println!(
        "{}",
        format!("  {} events up to date", ctx.service.store().len()).green()
    );
    Ok(())
}

pub async fn watch() -> Result<()> {
    let mut ctx = context::open().await?;

    if !ctx.service.is_remote() {
        anyhow::bail!("Watching needs a backend; famcal is running in local-only mode.");
    }

    if let famcal_core::remote::session::AuthStatus::Authenticated { email } = &ctx.status {
        println!("  Watching for changes as {} (Ctrl-C to stop)", email);
    }

    tokio::select! {
        result = ctx.service.watch() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    println!(
        "{}",
        format!("  {} events saved to {}", ctx.service.store().len(), ctx.config.events_path().display()).dimmed()
    );
    Ok(())
}
