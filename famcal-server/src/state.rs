use std::sync::Arc;

use anyhow::Result;
use famcal_core::config::AppConfig;
use famcal_core::error::{FamcalError, FamcalResult};
use famcal_core::holiday::HolidayOverlay;
use famcal_core::remote::rest::RestBackend;
use famcal_core::remote::session::{AuthSession, AuthStatus};
use famcal_core::store::EventStore;
use famcal_core::sync::SyncAdapter;
use famcal_core::CalendarService;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub type Service = CalendarService<RestBackend>;

/// The calendar as seen by the current session.
pub struct Calendar {
    pub status: AuthStatus,
    service: Option<Service>,
    watcher: Option<JoinHandle<()>>,
}

impl Calendar {
    /// The service, or `NotAuthenticated` while signed out.
    pub fn service(&mut self) -> FamcalResult<&mut Service> {
        self.service.as_mut().ok_or(FamcalError::NotAuthenticated)
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for Calendar {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub calendar: Arc<Mutex<Calendar>>,
}

impl AppState {
    /// Open the calendar for `config`, restoring a saved session if a backend
    /// is configured.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let Some(backend) = config.backend.clone() else {
            return Ok(Self::local(config));
        };

        let state = AppState {
            config: Arc::new(config),
            calendar: Arc::new(Mutex::new(Calendar {
                status: AuthStatus::Checking,
                service: None,
                watcher: None,
            })),
        };

        match AuthSession::restore(&backend, &state.config.session_path()).await {
            Some(session) => state.connect(session).await?,
            None => state.calendar.lock().await.status = AuthStatus::Unauthenticated,
        }

        Ok(state)
    }

    /// State that keeps events on this machine only.
    pub fn local(config: AppConfig) -> Self {
        let service = Service::local(
            EventStore::open(config.events_path()),
            HolidayOverlay::new(config.holiday_endpoint.clone()),
        )
        .with_toast_duration(config.toast_duration());

        AppState {
            config: Arc::new(config),
            calendar: Arc::new(Mutex::new(Calendar {
                status: AuthStatus::Local,
                service: Some(service),
                watcher: None,
            })),
        }
    }

    /// Switch to the signed-in calendar: pull events and start following changes.
    pub async fn connect(&self, session: AuthSession) -> FamcalResult<()> {
        let backend_config = self.config.backend.as_ref().ok_or(FamcalError::NotAuthenticated)?;
        let email = session.email().to_string();
        let backend = RestBackend::new(backend_config, session, self.config.session_path())?;

        let mut service = Service::remote(
            EventStore::open(self.config.events_path()),
            SyncAdapter::new(backend),
            HolidayOverlay::new(self.config.holiday_endpoint.clone()),
        )
        .with_toast_duration(self.config.toast_duration());

        // A failed first pull keeps the last saved copy.
        let _ = service.refresh().await;

        let feed = service
            .sync()
            .ok_or(FamcalError::NotAuthenticated)?
            .subscribe()?;

        let mut calendar = self.calendar.lock().await;
        calendar.stop_watcher();
        calendar.status = AuthStatus::Authenticated { email: email.clone() };
        calendar.service = Some(service);
        calendar.watcher = Some(self.spawn_watcher(feed));

        tracing::info!(%email, "calendar connected");
        Ok(())
    }

    /// Fetch holidays for `years` not merged yet. The calendar lock is
    /// released while the requests run.
    pub async fn load_holidays(&self, years: &[i32]) -> FamcalResult<()> {
        let fetch = {
            let mut calendar = self.calendar.lock().await;
            calendar.service()?.holidays().pending(years)
        };
        let Some(fetch) = fetch else {
            return Ok(());
        };

        let fetched = fetch.run().await;

        let mut calendar = self.calendar.lock().await;
        calendar.service()?.holidays_mut().apply(fetched);
        Ok(())
    }

    pub async fn disconnect(&self) -> FamcalResult<()> {
        AuthSession::clear(&self.config.session_path())?;

        let mut calendar = self.calendar.lock().await;
        calendar.stop_watcher();
        calendar.service = None;
        calendar.status = AuthStatus::Unauthenticated;

        tracing::info!("calendar disconnected");
        Ok(())
    }

    /// Refetch whenever the backend reports a change.
    fn spawn_watcher(&self, mut feed: famcal_core::remote::ChangeFeed) -> JoinHandle<()> {
        let calendar = Arc::clone(&self.calendar);

        tokio::spawn(async move {
            while feed.next().await.is_some() {
                let mut calendar = calendar.lock().await;
                if let Ok(service) = calendar.service() {
                    let _ = service.refresh().await;
                }
            }
        })
    }
}
