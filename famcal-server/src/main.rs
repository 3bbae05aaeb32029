mod routes;
mod singleton;
mod state;

use std::env;
use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use famcal_core::config::AppConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::state::AppState;

const DEFAULT_PORT: u16 = 4180;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()?;

    // Ensure only one instance uses this data directory
    let _lock = singleton::acquire_lock(&config.data_path())?;

    let state = AppState::new(config).await?;

    let port = env::var("FAMCAL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "famcal-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::calendar::router())
        .merge(routes::events::router())
        .merge(routes::auth::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FAMCAL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "famcal=debug,tower_http=debug,info"
        } else {
            "famcal=info,warn"
        })
    });

    let format = env::var("FAMCAL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}
