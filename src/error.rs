use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{lifecycle::InvalidTransition, poll::PollError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed or timed out.
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    Validation(String),
    /// Another poll is still active.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("poll has already ended")]
    AlreadyEnded,
    #[error("you have already answered this poll")]
    DuplicateAnswer,
    #[error("option index {index} is out of range (poll has {options} options)")]
    OutOfRange { index: i64, options: usize },
    /// Operation cannot be performed in the current lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<PollError> for ServiceError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::AlreadyEnded => ServiceError::AlreadyEnded,
            PollError::OptionOutOfRange { index, options } => {
                ServiceError::OutOfRange { index, options }
            }
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Validation(format!("validation failed: {err}"))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Storage(_) | ServiceError::Degraded => {
                AppError::ServiceUnavailable(message)
            }
            ServiceError::Validation(_) | ServiceError::OutOfRange { .. } => {
                AppError::BadRequest(message)
            }
            ServiceError::NotFound(_) => AppError::NotFound(message),
            ServiceError::Conflict(_)
            | ServiceError::AlreadyEnded
            | ServiceError::DuplicateAnswer
            | ServiceError::InvalidState(_) => AppError::Conflict(message),
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
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
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

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ServiceError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(ServiceError::AlreadyEnded), StatusCode::CONFLICT);
        assert_eq!(status_of(ServiceError::DuplicateAnswer), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ServiceError::OutOfRange {
                index: 3,
                options: 2
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Storage(StorageError::Timeout { millis: 10 })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn poll_errors_keep_their_details() {
        let err = ServiceError::from(PollError::OptionOutOfRange {
            index: -1,
            options: 2,
        });
        assert!(matches!(err, ServiceError::OutOfRange { index: -1, options: 2 }));
    }
}
