//! Contact email delivery over SMTP
//!
//! Each accepted inquiry produces two messages: a notification to the
//! operations inbox (Reply-To the submitter) and an acknowledgment to the
//! submitter. Both are requested together; the pair fails if either fails.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use thiserror::Error;

use crate::config::{MailConfig, SmtpSecurity};
use crate::models::InquiryPayload;
use crate::services::mail_dispatch_service::{DispatchOutcome, MailDispatcher};
use crate::utils::log_sanitizer::{mask_email_for_log, sanitize_for_log, sanitize_option_for_log};

pub const ACKNOWLEDGMENT_SUBJECT: &str = "Thank you for contacting Britonia Pharmacy Ltd";

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Send task failed: {0}")]
    Task(String),
}

/// Hands one finished message to a mail server
pub trait MailTransport: Send + Sync + 'static {
    fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Authenticated `lettre` SMTP relay
///
/// Port 465 speaks TLS from the first byte; any other port (587 in
/// particular) waits for the `220` greeting and upgrades with STARTTLS.
pub struct SmtpMailTransport {
    mailer: SmtpTransport,
}

impl SmtpMailTransport {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let (username, password) = config
            .credentials()
            .ok_or_else(|| MailError::Smtp("SMTP credentials not configured".to_string()))?;

        let security = config.smtp_security();
        let builder = match security {
            SmtpSecurity::Implicit => SmtpTransport::relay(&config.smtp_host),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&config.smtp_host),
        }
        .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!(
            smtp_host = %config.smtp_host,
            smtp_port = config.smtp_port,
            security = ?security,
            "SMTP relay configured with authentication"
        );

        let mailer = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { mailer })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, message: &Message) -> Result<(), MailError> {
        self.mailer
            .send(message)
            .map(|_| ())
            .map_err(|e| MailError::Smtp(e.to_string()))
    }
}

/// Composes and sends the two contact emails
pub struct EmailService<T: MailTransport = SmtpMailTransport> {
    transport: Arc<T>,
    from: Mailbox,
    operations_inbox: Mailbox,
    contact_address: String,
}

impl EmailService<SmtpMailTransport> {
    /// SMTP-backed service, or `None` when credentials are missing
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, MailError> {
        if config.credentials().is_none() {
            tracing::warn!("SMTP credentials not configured; /api/send-email will refuse requests");
            return Ok(None);
        }

        let transport = SmtpMailTransport::new(config)?;
        Self::new(config, transport).map(Some)
    }
}

impl<T: MailTransport> EmailService<T> {
    pub fn new(config: &MailConfig, transport: T) -> Result<Self, MailError> {
        Ok(Self {
            transport: Arc::new(transport),
            from: parse_mailbox(&config.from_email)?,
            operations_inbox: parse_mailbox(&config.to_email)?,
            contact_address: config.fallback_email.clone(),
        })
    }

    /// Message for the operations inbox; replies go straight to the submitter
    pub fn operator_notification(&self, payload: &InquiryPayload) -> Result<Message, MailError> {
        let reply_to = submitter_mailbox(payload)?;

        Message::builder()
            .from(self.from.clone())
            .to(self.operations_inbox.clone())
            .reply_to(reply_to)
            .subject(format!(
                "New Contact Form Submission: {}",
                single_line(&payload.subject)
            ))
            .header(ContentType::TEXT_PLAIN)
            .body(operator_notification_body(payload))
            .map_err(|e| MailError::Build(e.to_string()))
    }

    /// Auto-response to the submitter
    pub fn acknowledgment(&self, payload: &InquiryPayload) -> Result<Message, MailError> {
        let to = submitter_mailbox(payload)?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(ACKNOWLEDGMENT_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(acknowledgment_body(payload, &self.contact_address))
            .map_err(|e| MailError::Build(e.to_string()))
    }

    /// Send both emails for one inquiry
    ///
    /// Each email gets exactly one attempt, even when the other one fails.
    pub async fn send_inquiry(&self, payload: &InquiryPayload) -> Result<(), MailError> {
        tracing::info!(
            to = %self.operations_inbox,
            submitter = %mask_email_for_log(&payload.email),
            subject = %sanitize_for_log(&payload.subject),
            company = %sanitize_option_for_log(&payload.company),
            "Sending contact form emails"
        );

        let (notification, acknowledgment) = futures::join!(
            self.deliver("operator_notification", self.operator_notification(payload)),
            self.deliver("acknowledgment", self.acknowledgment(payload)),
        );

        notification.and(acknowledgment)
    }

    async fn deliver(&self, kind: &'static str, message: Result<Message, MailError>) -> Result<(), MailError> {
        let result = match message {
            Ok(message) => {
                let transport = self.transport.clone();
                tokio::task::spawn_blocking(move || transport.send(&message))
                    .await
                    .map_err(|e| MailError::Task(e.to_string()))
                    .and_then(|sent| sent)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::info!(kind, "Contact email sent"),
            Err(e) => tracing::error!(kind, error = %e, "Failed to send contact email"),
        }

        result
    }
}

#[async_trait]
impl<T: MailTransport> MailDispatcher for EmailService<T> {
    async fn dispatch(&self, payload: &InquiryPayload) -> DispatchOutcome {
        match self.send_inquiry(payload).await {
            Ok(()) => DispatchOutcome::Sent,
            Err(e) => DispatchOutcome::Failed(e.to_string()),
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::Address(format!("{}: {}", address, e)))
}

fn submitter_mailbox(payload: &InquiryPayload) -> Result<Mailbox, MailError> {
    let address = payload
        .email
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

    Ok(Mailbox::new(Some(single_line(&payload.name)), address))
}

/// Header values must not carry line breaks
fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn operator_notification_body(payload: &InquiryPayload) -> String {
    format!(
        "New contact form submission from the Britonia Pharmacy website:\n\
         \n\
         Name: {name}\n\
         Email: {email}\n\
         Company: {company}\n\
         Subject: {subject}\n\
         \n\
         Message:\n\
         {message}\n\
         \n\
         ---\n\
         This message was sent from the Britonia Pharmacy contact form.\n\
         Reply directly to this email to respond to the sender.\n",
        name = payload.name,
        email = payload.email,
        company = payload.company_or_default(),
        subject = payload.subject,
        message = payload.message,
    )
}

pub fn acknowledgment_body(payload: &InquiryPayload, contact_address: &str) -> String {
    format!(
        "Dear {name},\n\
         \n\
         Thank you for reaching out to Britonia Pharmacy Ltd. We have received your message \
         regarding \"{subject}\" and will respond within 24 hours during business days.\n\
         \n\
         Our team of pharmaceutical experts specializes in:\n\
         - Malaria drug distribution to government agencies\n\
         - Trademark registration (ARIPO, Madrid Protocol)\n\
         - Regulatory affairs (WAHO, AMA, WHO, ECOWAS)\n\
         - Pan-African pharmaceutical market access\n\
         \n\
         If you have an urgent matter, please contact us directly at {contact}.\n\
         \n\
         Best regards,\n\
         The Britonia Pharmacy Team\n\
         Accra, Ghana\n\
         \n\
         ---\n\
         This is an automated response. Please do not reply to this email.\n",
        name = payload.name,
        subject = payload.subject,
        contact = contact_address,
    )
}
