use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error type returned by handlers. Client-facing variants carry a message
/// that is safe to show; infrastructure variants are logged and replaced with a
/// generic message in the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("identity provider error: {0}")]
    Identity(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Identity(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("a record with the same unique fields already exists".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::Validation("a referenced record does not exist".to_string())
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::Identity(_) => {
                tracing::error!(error = %self, "identity provider request failed");
                "identity provider request failed".to_string()
            }
            ApiError::Database(_) | ApiError::Storage(_) => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
