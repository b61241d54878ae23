use crate::response::ApiResponse;
use crate::scoring::{CoreError, ErrorKind};
use anyhow::anyhow;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deadpool_diesel::InteractError;
use deadpool_diesel::postgres::PoolError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String), // 400

    #[error("Not Found: {0}")]
    NotFound(String), // 404

    #[error("Conflict: {0}")]
    Conflict(String), // 409

    #[error("Internal Server Error: {0}")]
    InternalServerError(#[from] anyhow::Error), // 500
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        error!("Database pool error encountered: {:?}", err);
        AppError::InternalServerError(anyhow::Error::new(err).context("Database pool error"))
    }
}

impl From<InteractError> for AppError {
    fn from(err: InteractError) -> Self {
        error!("Database interaction error encountered: {:?}", err);
        AppError::InternalServerError(anyhow!("Database interaction error: {}", err))
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            ErrorKind::InvalidState => {
                warn!("Rejected due to current state: {}", err);
                AppError::Conflict(err.to_string())
            }
            ErrorKind::ValidationFailed => AppError::BadRequest(err.to_string()),
            ErrorKind::StoreFailure => {
                AppError::InternalServerError(anyhow::Error::new(err).context("Store failure"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message),

            AppError::InternalServerError(source) => {
                error!(
                    "Responding with 500 Internal Server Error. Source: {:?}",
                    source
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()> {
            status_code: status.as_u16(),
            status_message: error_message,
            data: None,
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn status_of(err: CoreError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(status_of(CoreError::LabNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(CoreError::AlreadySolved {
                user_id: 1,
                challenge_id: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::Store(StoreError::UniqueViolation(
                "lab_progress".to_string()
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::ValidationFailed("empty".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::Store(StoreError::Unavailable("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
