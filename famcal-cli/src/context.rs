//! Builds the calendar service from the user's config and saved session.

use anyhow::Result;
use famcal_core::config::AppConfig;
use famcal_core::holiday::HolidayOverlay;
use famcal_core::remote::rest::RestBackend;
use famcal_core::remote::session::{AuthSession, AuthStatus};
use famcal_core::store::EventStore;
use famcal_core::sync::SyncAdapter;
use famcal_core::CalendarService;

use crate::utils::tui::create_spinner;

pub type Service = CalendarService<RestBackend>;

pub struct Context {
    pub config: AppConfig,
    pub status: AuthStatus,
    pub service: Service,
}

/// Open the calendar.
///
/// With a backend configured this restores the saved session and pulls the
/// current events; without a session it stops and asks the user to log in.
pub async fn open() -> Result<Context> {
    let config = AppConfig::load()?;
    let store = EventStore::open(config.events_path());
    let holidays = HolidayOverlay::new(config.holiday_endpoint.clone());

    let Some(backend_config) = config.backend.clone() else {
        let service = Service::local(store, holidays).with_toast_duration(config.toast_duration());
        return Ok(Context {
            config,
            status: AuthStatus::Local,
            service,
        });
    };

    let Some(session) = AuthSession::restore(&backend_config, &config.session_path()).await else {
        anyhow::bail!(
            "Not signed in.\n\n\
            Sign in with:\n  \
            famcal login"
        );
    };

    let status = AuthStatus::Authenticated {
        email: session.email().to_string(),
    };
    let backend = RestBackend::new(&backend_config, session, config.session_path())?;
    let mut service = Service::remote(store, SyncAdapter::new(backend), holidays)
        .with_toast_duration(config.toast_duration());

    let spinner = create_spinner("Loading events...".to_string());
    let refreshed = service.refresh().await;
    spinner.finish_and_clear();

    // Keep going on the last local copy if the backend is unreachable.
    if let Err(e) = refreshed {
        eprintln!("Could not reach the backend, showing saved events: {e}");
    }

    Ok(Context {
        config,
        status,
        service,
    })
}
