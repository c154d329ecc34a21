use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::game::ScoreError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A storage backend is installed but the operation failed against it.
    #[error("storage configured but failing: {0}")]
    Unavailable(#[source] StorageError),
    /// No usable storage backend; the message tells whether one is configured at all.
    #[error("{0}")]
    Degraded(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ScoreError> for ServiceError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::UnknownTeam(_) => ServiceError::NotFound(err.to_string()),
            ScoreError::OutOfRange(_) | ScoreError::NotANumber(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Storage missing or failing.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(_) | ServiceError::Degraded(_) => {
                AppError::ServiceUnavailable(err.to_string())
            }
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StorageStatus;

    #[test]
    fn score_errors_map_to_client_errors() {
        assert!(matches!(
            ServiceError::from(ScoreError::OutOfRange("181".into())),
            ServiceError::InvalidInput(_)
        ));
        assert!(matches!(
            ServiceError::from(ScoreError::NotANumber("abc".into())),
            ServiceError::InvalidInput(_)
        ));
        assert!(matches!(
            ServiceError::from(ScoreError::UnknownTeam("x".into())),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn outage_messages_tell_missing_from_broken() {
        let missing = AppError::from(ServiceError::Degraded(
            StorageStatus::NotConfigured {
                reason: "MONGO_URI is not set".into(),
            }
            .to_string(),
        ));
        let broken = AppError::from(ServiceError::Unavailable(StorageError::MissingGame));

        assert!(missing.to_string().contains("not configured"));
        assert!(broken.to_string().contains("configured but failing"));
        assert_eq!(
            missing.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            broken.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
