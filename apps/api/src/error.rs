use axum::Json;
use axum::http::StatusCode;
use axum::http::header::RETRY_AFTER;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rantboard_core::AppError;
use serde::Serialize;
use tracing::error;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked_until: Option<DateTime<Utc>>,
}

impl ErrorResponse {
    fn message(message: String) -> Self {
        Self {
            message,
            retry_after: None,
            reset_at: None,
            locked_until: None,
        }
    }
}

/// HTTP API error: application errors plus the expected rejections of
/// throttled and login routes.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    QuotaExceeded {
        message: String,
        retry_after_seconds: i64,
        reset_at: DateTime<Utc>,
    },
    LoginRejected {
        message: String,
        locked_until: Option<DateTime<Utc>>,
    },
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::App(error) => {
                let status = match error {
                    AppError::Validation(_) => StatusCode::BAD_REQUEST,
                    AppError::NotFound(_) => StatusCode::NOT_FOUND,
                    AppError::Conflict(_) => StatusCode::CONFLICT,
                    AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                    AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(%error, "request failed");
                }

                (status, Json(ErrorResponse::message(error.to_string()))).into_response()
            }
            Self::QuotaExceeded {
                message,
                retry_after_seconds,
                reset_at,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after_seconds.to_string())],
                Json(ErrorResponse {
                    retry_after: Some(retry_after_seconds),
                    reset_at: Some(reset_at),
                    ..ErrorResponse::message(message)
                }),
            )
                .into_response(),
            Self::LoginRejected {
                message,
                locked_until,
            } => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    locked_until,
                    ..ErrorResponse::message(message)
                }),
            )
                .into_response(),
        }
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
