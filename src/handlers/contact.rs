use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    middleware::error_handling::{AppError, Result},
    models::{InquiryInput, InquiryPayload, Notification, SubmissionError, SubmissionResult, ACCEPTED_COPY},
    services::DispatchOutcome,
    utils::log_sanitizer::mask_email_for_log,
    AppState,
};

/// Mail dispatch endpoint
///
/// Takes an already-stripped payload and sends the operator notification
/// plus the submitter acknowledgment. Required fields only need to be
/// present here; the full rules run in `submit_contact`.
pub async fn send_email(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InquiryPayload>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload?;

    if payload.validate().is_err() {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    }

    let mailer = state.mailer.as_ref().ok_or(AppError::MailNotConfigured)?;

    match mailer.dispatch(&payload).await {
        DispatchOutcome::Sent => Ok(Json(json!({
            "success": true,
            "message": "Email sent successfully"
        }))),
        DispatchOutcome::Failed(detail) => {
            tracing::error!(
                submitter = %mask_email_for_log(&payload.email),
                detail = %detail,
                "Error sending email"
            );
            Err(AppError::SendFailed)
        }
    }
}

/// Full contact submission: validation, bot checks, then mail dispatch
pub async fn submit_contact(
    State(state): State<AppState>,
    input: std::result::Result<Json<InquiryInput>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(input) = input?;

    let now_ms = state.clock.now_ms();
    let result = state.pipeline.process(&input, now_ms).await;

    match result {
        SubmissionResult::Accepted => Ok(Json(json!({
            "success": true,
            "message": ACCEPTED_COPY,
            "notification": Notification::accepted()
        }))),
        SubmissionResult::Invalid(errors) => Err(AppError::Validation(errors)),
        SubmissionResult::RejectedBot(reason) => Err(AppError::BotRejected(reason)),
        SubmissionResult::DispatchFailed(_) => Err(AppError::DispatchFailed(
            Notification::dispatch_failed(&state.config.mail.fallback_email).description,
        )),
        SubmissionResult::AlreadySubmitting => {
            Err(AppError::BadRequest(SubmissionError::InProgress.to_string()))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "britonia-contact",
        "mail_configured": state.mailer.is_some()
    }))
}
