// ============================================================================
// Security Headers Middleware
// ============================================================================
//
// The service only ever answers with JSON or the metrics text, so the policy
// is as closed as it gets:
//
// - Content-Security-Policy: default-src 'none'; frame-ancestors 'none'
// - X-Content-Type-Options: nosniff
// - X-Frame-Options: DENY
// - Referrer-Policy: no-referrer
// - Cache-Control: no-store on /api responses (they echo visitor input)
// - Strict-Transport-Security, only when serving TLS ourselves
//
// ============================================================================

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'; base-uri 'none'";

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    apply_headers(request, next, false).await
}

/// Same as `security_headers_middleware`, plus HSTS
pub async fn security_headers_with_hsts_middleware(request: Request, next: Next) -> Response {
    apply_headers(request, next, true).await
}

async fn apply_headers(request: Request, next: Next, hsts: bool) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(API_CSP),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    if is_api {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    if hsts {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    headers.remove("x-powered-by");

    response
}
