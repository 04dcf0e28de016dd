/// Mail dispatch seam
///
/// A dispatcher takes a stripped `InquiryPayload` and gets two emails out
/// (operator notification + submitter acknowledgment). Callers only see one
/// outcome for the pair. Nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::InquiryPayload;

pub const DEFAULT_DISPATCH_URL: &str = "http://localhost:8080/api/send-email";
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 15;

/// Result of handing a payload to the mail service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// Opaque detail for the logs; never shown to the visitor
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

#[async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn dispatch(&self, payload: &InquiryPayload) -> DispatchOutcome;
}

#[async_trait]
impl<D: MailDispatcher + ?Sized> MailDispatcher for Arc<D> {
    async fn dispatch(&self, payload: &InquiryPayload) -> DispatchOutcome {
        (**self).dispatch(payload).await
    }
}

/// Used when no SMTP credentials are configured; every dispatch fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredDispatcher;

#[async_trait]
impl MailDispatcher for UnconfiguredDispatcher {
    async fn dispatch(&self, _payload: &InquiryPayload) -> DispatchOutcome {
        DispatchOutcome::Failed("email service not configured".to_string())
    }
}

// ============================================================================
// Remote dispatcher (POST /api/send-email)
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpDispatchConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for HttpDispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DISPATCH_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
        }
    }
}

/// Calls the mail dispatch endpoint over HTTP
///
/// Transport errors, timeouts and non-2xx statuses all collapse into
/// `DispatchOutcome::Failed`.
#[derive(Debug, Clone)]
pub struct HttpMailDispatcher {
    http_client: reqwest::Client,
    config: HttpDispatchConfig,
}

impl HttpMailDispatcher {
    pub fn new(config: HttpDispatchConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http_client, config })
    }
}

#[async_trait]
impl MailDispatcher for HttpMailDispatcher {
    async fn dispatch(&self, payload: &InquiryPayload) -> DispatchOutcome {
        let response = match self
            .http_client
            .post(&self.config.endpoint)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return DispatchOutcome::Failed(format!(
                    "mail dispatch timed out after {}s",
                    self.config.timeout.as_secs()
                ));
            }
            Err(e) => return DispatchOutcome::Failed(format!("mail dispatch request failed: {}", e)),
        };

        let status = response.status();
        if status.is_success() {
            DispatchOutcome::Sent
        } else {
            let body = response.text().await.unwrap_or_default();
            DispatchOutcome::Failed(format!(
                "mail dispatch returned {}: {}",
                status,
                crate::utils::log_sanitizer::sanitize_for_log(&body)
            ))
        }
    }
}
