pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use config::AppConfig;
use handlers::contact::{health, send_email, submit_contact};
use middleware::{
    content_type_validation::content_type_validation_middleware,
    ip_rate_limiter::{rate_limit_middleware, RateLimitConfig, RateLimiter},
    metrics::{metrics_handler, metrics_middleware},
    request_id::request_id_middleware,
    security_headers::{security_headers_middleware, security_headers_with_hsts_middleware},
};
use services::{BotHeuristicService, MailDispatcher, SubmissionPipeline, UnconfiguredDispatcher};
use utils::clock::{Clock, SystemClock};

/// Inquiry bodies are a few kilobytes at most
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Delivers the notification + acknowledgment pair; `None` without SMTP credentials
    pub mailer: Option<Arc<dyn MailDispatcher>>,
    pub pipeline: Arc<SubmissionPipeline<Arc<dyn MailDispatcher>>>,
    pub clock: Arc<dyn Clock>,
    pub contact_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, mailer: Option<Arc<dyn MailDispatcher>>) -> Self {
        Self::with_clock(config, mailer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AppConfig,
        mailer: Option<Arc<dyn MailDispatcher>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher: Arc<dyn MailDispatcher> = match &mailer {
            Some(mailer) => mailer.clone(),
            None => Arc::new(UnconfiguredDispatcher),
        };
        let pipeline = SubmissionPipeline::new(
            dispatcher,
            BotHeuristicService::new(config.bot_min_fill_time_ms),
        );
        let contact_limiter = RateLimiter::new(RateLimitConfig::from(&config.contact_rate_limit));

        Self {
            config: Arc::new(config),
            mailer,
            pipeline: Arc::new(pipeline),
            clock,
            contact_limiter: Arc::new(contact_limiter),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let hsts = state.config.tls.enabled;

    let contact_routes = Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/send-email", post(send_email))
        .layer(axum::middleware::from_fn(content_type_validation_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state.contact_limiter.clone(),
            rate_limit_middleware,
        ));

    let router = Router::new()
        .merge(contact_routes)
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let router = if hsts {
        router.layer(axum::middleware::from_fn(security_headers_with_hsts_middleware))
    } else {
        router.layer(axum::middleware::from_fn(security_headers_middleware))
    };

    router
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    if origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS allows any origin");
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    tracing::info!("CORS configured with {} allowed origins", allowed.len());
    layer.allow_origin(allowed)
}
