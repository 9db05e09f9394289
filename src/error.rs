use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages shared between handlers and the reconciler.
pub mod msg {
    pub const USER_NOT_FOUND: &str = "User not found";
    pub const COURSE_NOT_FOUND: &str = "Course not found";
    pub const PAYMENT_NOT_FOUND: &str = "Payment not found";
    pub const PAYMENT_NOT_YET_RECORDED: &str =
        "Payment reference not yet recorded, retry delivery later";
    pub const ALREADY_OWNED: &str = "You have already purchased this course";
    pub const DUPLICATE_REFERENCE: &str = "Payment reference already exists";
    pub const PRIVILEGED_ONLY: &str = "Only admins can access this resource";
    pub const NOT_YOUR_ACCOUNT: &str = "You can only view your own courses";
    pub const INVALID_EMAIL: &str = "A valid email is required";
    pub const INVALID_AMOUNT: &str = "Amount must be greater than zero";
    pub const MISSING_USER_ID: &str = "userId is required";
    pub const MISSING_COURSE_ID: &str = "courseId is required";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The referenced record may still be in flight. Callers should re-deliver.
    #[error("Not yet found: {0}")]
    NotFoundTransient(String),

    #[error("Already owned: {0}")]
    AlreadyOwned(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AlreadyOwned(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) | AppError::NotFoundTransient(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Notification(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(m)
            | AppError::NotFound(m)
            | AppError::NotFoundTransient(m)
            | AppError::AlreadyOwned(m)
            | AppError::Unauthorized(m)
            | AppError::Conflict(m) => m.clone(),
            AppError::Gateway(m) => {
                tracing::error!("Gateway error: {}", m);
                "Payment gateway request failed".to_string()
            }
            AppError::Notification(m) => {
                tracing::error!("Notification error: {}", m);
                "Internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                "Internal server error".to_string()
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            retryable: matches!(self, AppError::NotFoundTransient(_)),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Turns an `Option` lookup into a `NotFound` error.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}
