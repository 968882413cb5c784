use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Profile and post errors
/// - E2xxx: Favorites and users
/// - E3xxx: Media proxy errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,
    TokenExpired,
    TokenInvalid,
    StorageUnavailable,

    // Profiles (E1xxx)
    ProfileNotFound,
    ProfileAlreadyExists,
    ImageNotFound,
    InvalidId,
    MissingMediaUrl,
    ImageAlreadyExists,
    MainImageConflict,

    // Favorites (E2xxx)
    UserNotFound,
    LoginUnavailable,

    // Media proxy (E3xxx)
    ProxyUrlInvalid,
    ProxyHostNotAllowed,
    UpstreamUnavailable,
    UpstreamNotFound,
    UpstreamInvalidMedia,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::TokenExpired => "E0010",
            Self::TokenInvalid => "E0011",
            Self::StorageUnavailable => "E0012",

            // Profiles
            Self::ProfileNotFound => "E1001",
            Self::ProfileAlreadyExists => "E1002",
            Self::ImageNotFound => "E1003",
            Self::InvalidId => "E1004",
            Self::MissingMediaUrl => "E1005",
            Self::ImageAlreadyExists => "E1006",
            Self::MainImageConflict => "E1007",

            // Favorites
            Self::UserNotFound => "E2001",
            Self::LoginUnavailable => "E2002",

            // Media proxy
            Self::ProxyUrlInvalid => "E3001",
            Self::ProxyHostNotAllowed => "E3002",
            Self::UpstreamUnavailable => "E3003",
            Self::UpstreamNotFound => "E3004",
            Self::UpstreamInvalidMedia => "E3005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable | Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError | Self::BadRequest | Self::InvalidId
            | Self::MissingMediaUrl | Self::ProxyUrlInvalid => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::ImageNotFound
            | Self::UserNotFound | Self::UpstreamNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid
            | Self::LoginUnavailable => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::ProxyHostNotAllowed => StatusCode::FORBIDDEN,
            Self::ProfileAlreadyExists | Self::ImageAlreadyExists
            | Self::MainImageConflict => StatusCode::CONFLICT,
            Self::UpstreamUnavailable | Self::UpstreamInvalidMedia => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn profile_not_found(id: &str) -> Self {
        Self::new(ErrorCode::ProfileNotFound, format!("profile '{id}' not found"))
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::ValidationError,
            _ => ErrorCode::InternalError,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        Self::with_details(ErrorCode::ValidationError, "request validation failed", details)
    }
}

/// Malformed bodies are bad requests; well-formed JSON of the wrong shape
/// fails validation. A body over the configured limit stays a 413.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match &rejection {
            JsonRejection::JsonDataError(_) => ErrorCode::ValidationError,
            _ if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
            _ => ErrorCode::BadRequest,
        };
        Self::new(code, rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            tracing::error!(error = %rejection.body_text(), "route and path extractor disagree");
            return Self::internal("internal server error");
        }
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Io(err) => {
                tracing::error!(error = %err, "storage io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "storage error"),
                )
            }
            AppError::Json(err) => {
                tracing::error!(error = %err, "stored document is not valid json");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "storage error"),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_renders_envelope() {
        let value = body_json(AppError::profile_not_found("jane")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E1001");
        assert_eq!(value["error"]["message"], "profile 'jane' not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn status_follows_error_code() {
        let response = AppError::new(ErrorCode::ProfileAlreadyExists, "taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::new(ErrorCode::UpstreamInvalidMedia, "not an image").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::new(ErrorCode::LoginUnavailable, "nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn io_errors_hide_details() {
        let err = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let value = body_json(err).await;

        assert_eq!(value["error"]["code"], "E0001");
        assert_eq!(value["error"]["message"], "storage error");
    }

    #[tokio::test]
    async fn diesel_not_found_is_404() {
        let response = AppError::from(diesel::result::Error::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError, ErrorCode::ValidationError, ErrorCode::NotFound,
            ErrorCode::Unauthorized, ErrorCode::Forbidden, ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest, ErrorCode::PayloadTooLarge, ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid, ErrorCode::StorageUnavailable, ErrorCode::ProfileNotFound,
            ErrorCode::ProfileAlreadyExists, ErrorCode::ImageNotFound, ErrorCode::InvalidId,
            ErrorCode::MissingMediaUrl, ErrorCode::ImageAlreadyExists, ErrorCode::MainImageConflict, ErrorCode::UserNotFound, ErrorCode::LoginUnavailable,
            ErrorCode::ProxyUrlInvalid, ErrorCode::ProxyHostNotAllowed,
            ErrorCode::UpstreamUnavailable, ErrorCode::UpstreamNotFound,
            ErrorCode::UpstreamInvalidMedia,
        ];
        let mut codes: Vec<_> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
