use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure reading or writing rows in a backing store. Keeps the native
/// Postgres error code around for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{context}")]
pub struct RepositoryError {
    pub context: String,
    pub code: Option<String>,
    #[source]
    pub source: sqlx::Error,
}

impl RepositoryError {
    pub fn new(context: impl Into<String>, source: sqlx::Error) -> Self {
        let code = source
            .as_database_error()
            .and_then(|e| e.code())
            .map(|c| c.into_owned());
        Self {
            context: context.into(),
            code,
            source,
        }
    }
}

/// Failure while creating or mutating a profile row.
#[derive(Debug, thiserror::Error)]
#[error("{context}")]
pub struct ProfileError {
    pub context: String,
    pub code: Option<String>,
    #[source]
    pub source: sqlx::Error,
}

impl ProfileError {
    pub fn new(context: impl Into<String>, source: sqlx::Error) -> Self {
        let code = source
            .as_database_error()
            .and_then(|e| e.code())
            .map(|c| c.into_owned());
        Self {
            context: context.into(),
            code,
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Repository(e) => {
                tracing::error!(error = %e, code = ?e.code, "Repository error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Profile(e) => {
                tracing::error!(error = %e, code = ?e.code, "Profile error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "code": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
