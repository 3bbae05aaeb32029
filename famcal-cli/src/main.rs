mod commands;
mod context;
mod render;
mod utils;

use std::env;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "famcal")]
#[command(about = "Browse and edit your family calendar, locally or synced to a shared backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a month grid with events and holidays
    Month {
        /// Month to show (YYYY-MM, defaults to the current month)
        month: Option<String>,
    },
    /// List the events on a day, or show one event in detail
    Show {
        /// Day to list (YYYY-MM-DD)
        #[arg(conflicts_with = "id")]
        date: Option<String>,

        /// Event id to show in detail
        #[arg(long)]
        id: Option<String>,
    },
    /// Add an event (prompts for anything not given)
    Add {
        #[arg(short, long)]
        title: Option<String>,

        /// Day of the event (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Time of day (HH:MM)
        #[arg(long, conflicts_with = "all_day")]
        time: Option<String>,

        #[arg(long)]
        all_day: bool,

        #[arg(short, long)]
        notes: Option<String>,

        /// none, red, orange, green, blue or purple
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Change an existing event
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Move the event to another day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long, conflicts_with = "all_day")]
        time: Option<String>,

        #[arg(long)]
        all_day: bool,

        #[arg(short, long)]
        notes: Option<String>,

        #[arg(short, long)]
        color: Option<String>,
    },
    /// Delete an event
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Sign in to the configured backend
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Replace local events with the backend's copy
    Sync,
    /// Keep local events in step with the backend until interrupted
    Watch,
    /// Scroll through months around today
    Browse {
        /// Lines per page
        #[arg(long, default_value_t = 30)]
        height: usize,
    },
    /// List holidays for a year
    Holidays {
        /// Year to list (defaults to the current year)
        year: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Month { month } => commands::month::run(month.as_deref()).await,
        Commands::Show { date, id } => commands::show::run(date.as_deref(), id.as_deref()).await,
        Commands::Add {
            title,
            date,
            time,
            all_day,
            notes,
            color,
        } => {
            let fields = commands::add::Fields {
                title,
                date,
                time,
                all_day,
                notes,
                color,
            };
            commands::add::run(fields).await
        }
        Commands::Edit {
            id,
            title,
            date,
            time,
            all_day,
            notes,
            color,
        } => {
            let fields = commands::add::Fields {
                title,
                date,
                time,
                all_day,
                notes,
                color,
            };
            commands::edit::run(&id, fields).await
        }
        Commands::Delete { id, yes } => commands::delete::run(&id, yes).await,
        Commands::Login { email } => commands::login::run(email).await,
        Commands::Logout => commands::login::logout(),
        Commands::Sync => commands::sync::run().await,
        Commands::Watch => commands::sync::watch().await,
        Commands::Browse { height } => commands::browse::run(height).await,
        Commands::Holidays { year } => commands::holidays::run(year).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FAMCAL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "famcal=debug,info"
        } else {
            "famcal=info,warn"
        })
    });

    let format = env::var("FAMCAL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
