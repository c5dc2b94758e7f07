use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Wire-visible response messages. Clients match on some of these strings,
/// so changing them is a breaking change.
pub mod msg {
    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const TRANSACTION_NOT_FOUND: &str = "Transaction not found or already processed";
    pub const USER_NOT_FOUND: &str = "User not found";
    pub const COURSE_NOT_FOUND: &str = "Course not found";
    pub const AGENT_NOT_FOUND: &str = "Agent not found";
    pub const REFERRAL_SETTINGS_NOT_FOUND: &str = "Referral settings not configured";
    pub const ALREADY_ENROLLED: &str = "User already enrolled in this course";
    pub const MISSING_PAYMENT_FIELDS: &str = "Missing payment verification fields";
    pub const EMAIL_TAKEN: &str = "Email already registered";
    pub const REFERRER_NOT_FOUND: &str = "Referrer not found";
    pub const AGENT_CODE_TAKEN: &str = "Agent code already in use";

    pub const NAME_EMPTY: &str = "Name must not be empty";
    pub const EMAIL_EMPTY: &str = "Email must not be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const TITLE_EMPTY: &str = "Title must not be empty";
    pub const DURATION_INVALID: &str = "Course duration must be at least one day";
    pub const PRICE_INVALID: &str = "Price must be greater than zero";
    pub const AGENT_CODE_EMPTY: &str = "Agent code must not be empty";
    pub const AMOUNT_NEGATIVE: &str = "Amount must not be negative";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Transaction not found or already processed")]
    TransactionNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request body: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("Invalid path parameter: {0}")]
    PathRejection(#[from] PathRejection),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Every error leaves the service as `{"success": false, "error": "..."}`.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, msg::INVALID_SIGNATURE.to_string())
            }
            AppError::TransactionNotFound => {
                (StatusCode::NOT_FOUND, msg::TRANSACTION_NOT_FOUND.to_string())
            }
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            AppError::JsonRejection(e) => (StatusCode::BAD_REQUEST, e.body_text()),
            AppError::PathRejection(e) => (StatusCode::BAD_REQUEST, e.body_text()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            // serde_json errors here come from (de)serializing stored purchase
            // arrays, not from request bodies, so they are server faults.
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Converts `Ok(None)` lookups into 404s without a closure at every call site.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}
