// src/error.rs
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template rendering error: {0}")]
    TemplateError(#[from] askama::Error),

    #[error("Error while processing password")]
    PasswordHashingError,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Unexpected internal error")]
    InternalServerError,

    #[error("Not authenticated")]
    Unauthorized,

    // --- Domain errors ---
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Only the owning professor may act on this request")]
    NotOwner,

    #[error("Invalid professor selected")]
    InvalidProfessor,

    #[error("Request has already been processed")]
    AlreadyProcessed,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("You already have a pending request with this professor")]
    DuplicatePendingRequest,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Roster validation failed. Please check your details with admin.")]
    RosterMismatch,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Document issuance failed: {0}")]
    IssuanceFailed(String),
}

impl AppError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotOwner => "NOT_OWNER",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidProfessor => "INVALID_PROFESSOR",
            AppError::AlreadyProcessed => "ALREADY_PROCESSED",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::DuplicatePendingRequest => "DUPLICATE_PENDING_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RosterMismatch => "ROSTER_MISMATCH",
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::IssuanceFailed(_) => "ISSUANCE_FAILED",
            _ => "INTERNAL_ERROR",
        }
    }
}

// Converts AppError into a JSON error response
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::NotOwner => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::AlreadyProcessed
            | AppError::InvalidState(_)
            | AppError::DuplicatePendingRequest
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidProfessor
            | AppError::RosterMismatch
            | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Infrastructure details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:?}", self);
            match &self {
                AppError::IssuanceFailed(_) => "Failed to generate the document.".to_string(),
                _ => "An unexpected error occurred.".to_string(),
            }
        } else {
            tracing::debug!("Request refused: {}", self);
            self.to_string()
        };

        let body = json!({
            "success": false,
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

// Default Result type for the application
pub type AppResult<T = ()> = Result<T, AppError>;
