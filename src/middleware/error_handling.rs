// ============================================================================
// Error Handling - uniform JSON error responses
// ============================================================================
//
// Every error leaves the service as
//
//     { "success": false, "error": "<safe message>", "status": <code> }
//
// plus a `fields` map for validation failures. SMTP errors, HTTP client
// errors and anything else internal are logged with tracing::error! and
// replaced by a generic message. Bot rejections only ever carry the generic
// copy for their reason.
//
// ============================================================================

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::{BotReason, FieldErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("JSON error: {0}")]
    Json(#[from] JsonRejection),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Submission rejected")]
    BotRejected(BotReason),

    #[error("Email service not configured")]
    MailNotConfigured,

    /// Message is already safe to show; the detail was logged where it happened
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Failed to send email")]
    SendFailed,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields = None;

        let (status, error_message) = match self {
            AppError::Validation(errors) => {
                fields = Some(errors);
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string())
            }
            AppError::Json(ref e) => {
                tracing::debug!("JSON rejection: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BotRejected(reason) => {
                (StatusCode::BAD_REQUEST, reason.user_message().to_string())
            }
            AppError::MailNotConfigured => {
                tracing::error!("SMTP credentials not configured");
                (StatusCode::INTERNAL_SERVER_ERROR, "Email service not configured".to_string())
            }
            AppError::DispatchFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::SendFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email".to_string())
            }
            AppError::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
            "status": status.as_u16()
        });
        if let Some(fields) = fields {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
