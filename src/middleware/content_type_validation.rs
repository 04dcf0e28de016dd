// ============================================================================
// Content-Type Validation Middleware
// ============================================================================
//
// The contact endpoints only accept JSON. A POST with any other Content-Type
// (a bare HTML form post, text/plain from a script) is refused with 415
// before the body is read; a POST with none at all gets 400.
//
// ============================================================================

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::middleware::error_handling::AppError;
use crate::utils::log_sanitizer::sanitize_for_log;

pub async fn content_type_validation_middleware(request: Request, next: Next) -> Response {
    if !matches!(request.method(), &Method::POST | &Method::PUT | &Method::PATCH) {
        return next.run(request).await;
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    match content_type {
        Some(ct) if is_json(ct) => next.run(request).await,
        Some(ct) => {
            tracing::warn!(
                path = %sanitize_for_log(request.uri().path()),
                content_type = %sanitize_for_log(ct),
                "Rejected non-JSON body"
            );
            AppError::UnsupportedMediaType(
                "Unsupported Content-Type. Expected: application/json".to_string(),
            )
            .into_response()
        }
        None => AppError::BadRequest("Content-Type header required for this request".to_string())
            .into_response(),
    }
}

/// `application/json`, ignoring parameters such as charset
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|base| base.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
