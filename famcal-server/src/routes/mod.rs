pub mod auth;
pub mod calendar;
pub mod events;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use famcal_core::FamcalError;
use serde::Serialize;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert errors to HTTP responses, picking the status from the famcal error kind
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<FamcalError>() {
            Some(FamcalError::Validation(_) | FamcalError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            Some(FamcalError::Auth(_) | FamcalError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            Some(FamcalError::EventNotFound(_)) => StatusCode::NOT_FOUND,
            Some(
                FamcalError::RemoteRead(_) | FamcalError::RemoteWrite(_) | FamcalError::Holiday { .. },
            ) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, %status, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_status() {
        let cases = [
            (FamcalError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (FamcalError::InvalidKey("x".into()), StatusCode::BAD_REQUEST),
            (FamcalError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (FamcalError::EventNotFound("x".into()), StatusCode::NOT_FOUND),
            (FamcalError::RemoteWrite("x".into()), StatusCode::BAD_GATEWAY),
            (FamcalError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
