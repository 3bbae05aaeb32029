//! Email/password session with the hosted backend.
//!
//! Tokens are persisted next to the local event store so a restart does not
//! require signing in again.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{FamcalError, FamcalResult};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Check your email and password.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    email: String,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    email: Option<String>,
}

impl AuthSession {
    pub fn new(email: &str, access_token: &str, refresh_token: &str, expires_at: DateTime<Utc>) -> Self {
        AuthSession {
            email: email.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub async fn sign_in(config: &BackendConfig, email: &str, password: &str) -> FamcalResult<Self> {
        let tokens = token_request(
            config,
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await?;

        let email = tokens
            .user
            .as_ref()
            .and_then(|u| u.email.clone())
            .unwrap_or_else(|| email.to_string());

        Ok(Self::from_tokens(email, tokens))
    }

    pub async fn refresh(&mut self, config: &BackendConfig) -> FamcalResult<()> {
        let tokens = token_request(
            config,
            "refresh_token",
            serde_json::json!({ "refresh_token": self.refresh_token }),
        )
        .await?;

        *self = Self::from_tokens(self.email.clone(), tokens);
        Ok(())
    }

    fn from_tokens(email: String, tokens: TokenResponse) -> Self {
        AuthSession {
            email,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        }
    }

    /// Load a saved session, refreshing it when expired.
    ///
    /// A missing or unusable session yields `None`.
    pub async fn restore(config: &BackendConfig, path: &Path) -> Option<Self> {
        let mut session = match Self::load(path) {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session");
                return None;
            }
        };

        if session.is_expired(Utc::now()) {
            if let Err(e) = session.refresh(config).await {
                tracing::warn!(error = %e, "session refresh failed");
                return None;
            }
            if let Err(e) = session.save(path) {
                tracing::warn!(error = %e, "could not save refreshed session");
            }
        }

        Some(session)
    }

    pub fn load(path: &Path) -> FamcalResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)?;
        let session = toml::from_str(&contents)
            .map_err(|e| FamcalError::Auth(format!("Could not parse {}: {e}", path.display())))?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> FamcalResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| FamcalError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;

        // Owner-only, the file holds bearer tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn clear(path: &Path) -> FamcalResult<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

async fn token_request(
    config: &BackendConfig,
    grant_type: &str,
    body: serde_json::Value,
) -> FamcalResult<TokenResponse> {
    let url = format!("{}/auth/v1/token", config.url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .post(url)
        .query(&[("grant_type", grant_type)])
        .header("apikey", &config.anon_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| FamcalError::Auth(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(FamcalError::Auth(format!("HTTP {}: {}", status, text)));
    }

    response
        .json()
        .await
        .map_err(|e| FamcalError::Auth(format!("Unexpected token response: {e}")))
}

/// Where the app stands with respect to signing in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    /// Looking for a saved session.
    Checking,
    /// No backend configured; everything stays on this machine.
    Local,
    Unauthenticated,
    Authenticated { email: String },
}

impl AuthStatus {
    /// Whether the calendar itself should be shown.
    pub fn calendar_visible(&self) -> bool {
        matches!(self, AuthStatus::Local | AuthStatus::Authenticated { .. })
    }
}

/// State of the login form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Message shown under the form after a failed attempt.
    pub error: Option<String>,
    pub submitting: bool,
}

impl LoginForm {
    /// Sign in with the form's contents. On failure the field message is set
    /// and the form can be submitted again; on success the password is cleared.
    pub async fn submit(&mut self, config: &BackendConfig, session_path: &Path) -> Option<AuthSession> {
        if self.submitting {
            return None;
        }
        self.submitting = true;
        self.error = None;

        let result = AuthSession::sign_in(config, self.email.trim(), &self.password).await;
        self.submitting = false;

        match result {
            Ok(session) => {
                self.password.clear();
                if let Err(e) = session.save(session_path) {
                    tracing::warn!(error = %e, "could not save session");
                }
                tracing::info!(email = %session.email(), "signed in");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign in failed");
                self.error = Some(LOGIN_FAILED_MESSAGE.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            // Nothing listens on port 9 locally; requests fail fast.
            url: "http://127.0.0.1:9".into(),
            anon_key: "anon".into(),
            poll_interval_secs: 15,
        }
    }

    #[test]
    fn session_file_round_trip_is_private() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let expires = Utc::now() + Duration::hours(1);
        let session = AuthSession::new("mom@example.com", "at", "rt", expires);

        session.save(&path).unwrap();
        let loaded = AuthSession::load(&path).unwrap().unwrap();
        assert_eq!(loaded.email(), "mom@example.com");
        assert!(!loaded.is_expired(Utc::now()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        AuthSession::clear(&path).unwrap();
        assert!(AuthSession::load(&path).unwrap().is_none());
        AuthSession::clear(&path).unwrap();
    }

    #[tokio::test]
    async fn restore_without_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AuthSession::restore(&config(), &dir.path().join("session.toml")).await.is_none());
    }

    #[tokio::test]
    async fn failed_login_sets_field_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = LoginForm {
            email: " dad@example.com ".into(),
            password: "secret".into(),
            ..Default::default()
        };

        let session = form.submit(&config(), &dir.path().join("session.toml")).await;
        assert!(session.is_none());
        assert_eq!(form.error.as_deref(), Some(LOGIN_FAILED_MESSAGE));
        assert!(!form.submitting);
        assert_eq!(form.password, "secret");
    }

    #[test]
    fn calendar_visibility_by_status() {
        assert!(AuthStatus::Local.calendar_visible());
        assert!(AuthStatus::Authenticated { email: "a".into() }.calendar_visible());
        assert!(!AuthStatus::Checking.calendar_visible());
        assert!(!AuthStatus::Unauthenticated.calendar_visible());
    }
}
