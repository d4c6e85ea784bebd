use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    bingo::card::GenerationError,
    dao::storage::StorageError,
    playback::device::DeviceCommandError,
    provider::ProviderError,
    state::session::SessionError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The music provider failed.
    #[error("music provider error")]
    Provider(#[source] ProviderError),
    /// A card could not be generated.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        ServiceError::Provider(err)
    }
}

impl From<DeviceCommandError> for ServiceError {
    fn from(err: DeviceCommandError) -> Self {
        ServiceError::Provider(err.source)
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoActiveSession => ServiceError::NotFound("no active game".into()),
            SessionError::CellOutOfRange { .. } | SessionError::IndexOutOfRange { .. } => {
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
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Well-formed request that cannot be honoured.
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    /// An upstream service failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Provider(ProviderError::NotConfigured) => {
                AppError::ServiceUnavailable(ProviderError::NotConfigured.to_string())
            }
            ServiceError::Provider(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Generation(source) => AppError::Unprocessable(source.to_string()),
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
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
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

    fn status(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn session_errors_map_to_client_statuses() {
        assert_eq!(
            status(SessionError::NoActiveSession.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(SessionError::CellOutOfRange { index: 30 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(
                SessionError::IndexOutOfRange {
                    index: 24,
                    item_count: 24
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn generation_and_provider_failures() {
        let insufficient = GenerationError::InsufficientPool {
            required: 24,
            actual: 3,
        };
        assert_eq!(
            status(insufficient.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(ProviderError::CredentialExpired.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(ProviderError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
