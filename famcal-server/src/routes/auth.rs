//! Sign-in endpoints

use axum::{Json, Router, extract::State, routing::post};
use famcal_core::FamcalError;
use famcal_core::remote::session::{AuthStatus, LoginForm};
use serde::Deserialize;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - Sign in with email and password
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthStatus>, AppError> {
    let Some(backend) = state.config.backend.as_ref() else {
        return Err(FamcalError::Validation("No backend configured; running in local-only mode".into()).into());
    };

    let mut form = LoginForm {
        email: request.email,
        password: request.password,
        ..Default::default()
    };

    let Some(session) = form.submit(backend, &state.config.session_path()).await else {
        let message = form.error.unwrap_or_default();
        return Err(FamcalError::Auth(message).into());
    };

    state.connect(session).await?;
    Ok(Json(state.calendar.lock().await.status.clone()))
}

/// POST /auth/logout - Forget the saved session
async fn logout(State(state): State<AppState>) -> Result<Json<AuthStatus>, AppError> {
    if state.config.backend.is_none() {
        return Err(FamcalError::Validation("No backend configured; nothing to sign out of".into()).into());
    }

    state.disconnect().await?;
    Ok(Json(state.calendar.lock().await.status.clone()))
}
