/// Per-IP rate limiting for the public contact endpoints
///
/// Thread-safe, in-memory sliding window keyed by client IP.
/// - Caps how many inquiries one address can push through in a window
/// - Idle trackers are evicted by a background sweep
///
/// Single-instance only; the counters live in this process.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time::sleep;

use crate::config::ContactRateLimit;
use crate::middleware::error_handling::AppError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    pub window: Duration,
}

impl From<&ContactRateLimit> for RateLimitConfig {
    fn from(limit: &ContactRateLimit) -> Self {
        Self {
            max_requests: limit.max_requests,
            window: limit.window,
        }
    }
}

struct IpTracker {
    requests: Vec<Instant>,
    last_seen: Instant,
}

impl IpTracker {
    fn new() -> Self {
        Self {
            requests: Vec::new(),
            last_seen: Instant::now(),
        }
    }

    fn check_limit(&mut self, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        self.requests
            .retain(|&at| now.duration_since(at) < config.window);
        self.last_seen = now;

        if self.requests.len() >= config.max_requests as usize {
            return false;
        }

        self.requests.push(now);
        true
    }

    fn retry_after(&self, config: &RateLimitConfig) -> u64 {
        match self.requests.first() {
            Some(&oldest) => {
                let remaining = config.window.saturating_sub(oldest.elapsed());
                // Round up so clients never retry a second early
                remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
            }
            None => 0,
        }
    }
}

pub struct RateLimiter {
    trackers: Arc<DashMap<String, IpTracker>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            trackers: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Sweep idle trackers every five minutes. Needs a running tokio runtime.
    pub fn spawn_cleanup(&self) {
        let trackers = self.trackers.clone();
        let idle = self.config.window * 2;
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(300)).await;
                trackers.retain(|_, tracker| tracker.last_seen.elapsed() < idle);
            }
        });
    }

    /// `Err` carries the Retry-After seconds
    pub fn check(&self, ip: &str) -> Result<(), u64> {
        let mut entry = self
            .trackers
            .entry(ip.to_string())
            .or_insert_with(IpTracker::new);

        if entry.check_limit(&self.config) {
            Ok(())
        } else {
            Err(entry.retry_after(&self.config))
        }
    }

    pub fn tracked_ips(&self) -> usize {
        self.trackers.len()
    }
}

/// Peer address from `ConnectInfo`, when the server was started with it
fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match limiter.check(&ip) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(ip = %ip, retry_after, "Contact rate limit exceeded");
            let mut response = AppError::TooManyRequests(format!(
                "Too many submissions. Try again in {} seconds.",
                retry_after
            ))
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}
