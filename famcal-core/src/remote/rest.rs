//! REST client for the hosted events relation.
//!
//! The backend owns the signed-in session. An expired access token is
//! refreshed before a request, and a request rejected with 401 is retried
//! once with a refreshed token. Refreshed tokens are saved to the session
//! file.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tokio::sync::{RwLock, mpsc};

use crate::config::BackendConfig;
use crate::constants::REMOTE_EVENT_COLUMNS;
use crate::error::{FamcalError, FamcalResult};
use crate::remote::session::AuthSession;
use crate::remote::{ChangeFeed, ChangeNotice, EventBackend, RemotePayload, RemoteRow};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated client for `<url>/rest/v1/events`.
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    config: BackendConfig,
    base_url: String,
    session: Arc<RwLock<AuthSession>>,
    session_path: PathBuf,
    poll_interval: Duration,
}

impl RestBackend {
    pub fn new(
        config: &BackendConfig,
        session: AuthSession,
        session_path: impl Into<PathBuf>,
    ) -> FamcalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FamcalError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(RestBackend {
            client,
            config: config.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(session)),
            session_path: session_path.into(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
        })
    }

    fn request(&self, method: Method, query: &[(&str, &str)], token: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/events", self.base_url))
            .query(query)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    /// Current access token, refreshed first if it has expired.
    async fn access_token(&self) -> FamcalResult<String> {
        let token = {
            let session = self.session.read().await;
            if !session.is_expired(Utc::now()) {
                return Ok(session.access_token().to_string());
            }
            session.access_token().to_string()
        };
        self.renew(&token).await
    }

    /// Refresh the session unless another request already replaced `stale`.
    async fn renew(&self, stale: &str) -> FamcalResult<String> {
        let mut session = self.session.write().await;
        if session.access_token() != stale {
            return Ok(session.access_token().to_string());
        }

        tracing::debug!(email = %session.email(), "refreshing access token");
        session.refresh(&self.config).await?;
        if let Err(e) = session.save(&self.session_path) {
            tracing::warn!(error = %e, "could not save refreshed session");
        }

        Ok(session.access_token().to_string())
    }

    /// Send the request `build` makes for a token, retrying once with a
    /// refreshed token when the backend answers 401.
    async fn send<F>(&self, build: F, to_error: fn(String) -> FamcalError) -> FamcalResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&token)
            .send()
            .await
            .map_err(|e| to_error(e.to_string()))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let token = self.renew(&token).await?;
        build(&token)
            .send()
            .await
            .map_err(|e| to_error(e.to_string()))
    }

    async fn fingerprint(&self) -> FamcalResult<u64> {
        let rows = self.list_events().await?;
        let encoded = serde_json::to_string(&rows)?;
        let mut hasher = DefaultHasher::new();
        encoded.hash(&mut hasher);
        Ok(hasher.finish())
    }
}

async fn rows_from(response: Response, to_error: fn(String) -> FamcalError) -> FamcalResult<Vec<RemoteRow>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(to_error(format!("HTTP {}: {}", status, body)));
    }

    response
        .json::<Vec<RemoteRow>>()
        .await
        .map_err(|e| to_error(format!("Unexpected response: {e}")))
}

fn single(rows: Vec<RemoteRow>) -> FamcalResult<RemoteRow> {
    rows.into_iter()
        .next()
        .ok_or_else(|| FamcalError::RemoteWrite("Backend returned no row".into()))
}

impl EventBackend for RestBackend {
    async fn list_events(&self) -> FamcalResult<Vec<RemoteRow>> {
        let query = [("select", REMOTE_EVENT_COLUMNS), ("order", "start_at.asc")];
        let response = self
            .send(|token| self.request(Method::GET, &query, token), FamcalError::RemoteRead)
            .await?;

        rows_from(response, FamcalError::RemoteRead).await
    }

    async fn insert_event(&self, payload: &RemotePayload) -> FamcalResult<RemoteRow> {
        let query = [("select", REMOTE_EVENT_COLUMNS)];
        let response = self
            .send(
                |token| {
                    self.request(Method::POST, &query, token)
                        .header("Prefer", "return=representation")
                        .json(payload)
                },
                FamcalError::RemoteWrite,
            )
            .await?;

        single(rows_from(response, FamcalError::RemoteWrite).await?)
    }

    async fn update_event(&self, id: &str, payload: &RemotePayload) -> FamcalResult<RemoteRow> {
        let filter = format!("eq.{}", id);
        let query = [("id", filter.as_str()), ("select", REMOTE_EVENT_COLUMNS)];
        let response = self
            .send(
                |token| {
                    self.request(Method::PATCH, &query, token)
                        .header("Prefer", "return=representation")
                        .json(payload)
                },
                FamcalError::RemoteWrite,
            )
            .await?;

        single(rows_from(response, FamcalError::RemoteWrite).await?)
    }

    async fn delete_event(&self, id: &str) -> FamcalResult<()> {
        let filter = format!("eq.{}", id);
        let query = [("id", filter.as_str())];
        let response = self
            .send(|token| self.request(Method::DELETE, &query, token), FamcalError::RemoteWrite)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FamcalError::RemoteWrite(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }

    /// Poll the listing and report whenever its contents change.
    fn subscribe(&self) -> FamcalResult<ChangeFeed> {
        let (tx, rx) = mpsc::channel(8);
        let backend = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(backend.poll_interval);
            let mut last: Option<u64> = None;

            loop {
                interval.tick().await;

                let current = match backend.fingerprint().await {
                    Ok(fp) => fp,
                    Err(e) => {
                        tracing::warn!(error = %e, "change poll failed");
                        continue;
                    }
                };

                let changed = last.is_some_and(|prev| prev != current);
                last = Some(current);

                if changed && tx.send(ChangeNotice).await.is_err() {
                    break;
                }
            }
        });

        Ok(ChangeFeed::new(rx, Some(task)))
    }
}
