//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::AnalysisError;
use crate::sessions::RegistryError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Non-standard status used when the client aborted its own request.
pub const STATUS_CLIENT_CLOSED: u16 = 499;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("{0}")]
    MissingCredential(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Model server error: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Cancelled => StatusCode::from_u16(STATUS_CLIENT_CLOSED)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::MissingCredential(_)
            | ApiError::Internal(_)
            | ApiError::Analysis(_)
            | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Cancelled => Some("cancelled"),
            ApiError::MissingCredential(_) => Some("missing_credential"),
            ApiError::Conflict(_) => Some("session_in_flight"),
            ApiError::Unavailable(_) => Some("too_many_sessions"),
            _ => None,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled => ApiError::Cancelled,
            AnalysisError::ProviderDisabled(_) => ApiError::BadRequest(err.to_string()),
            AnalysisError::MissingCredential(_) => ApiError::MissingCredential(err.to_string()),
            AnalysisError::Workspace(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::Analysis(err.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            RegistryError::AtCapacity(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametag_models::ProviderKind;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Cancelled.status_code().as_u16(), 499);
        assert_eq!(
            ApiError::from(AnalysisError::ProviderDisabled(ProviderKind::Cloud)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AnalysisError::MissingCredential("OPENROUTER_API_KEY")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AnalysisError::Cancelled).code(),
            Some("cancelled")
        );
    }
}
