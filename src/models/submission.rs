use serde::Serialize;
use thiserror::Error;

use crate::models::inquiry::FieldErrors;

pub const HONEYPOT_REJECTION_COPY: &str = "There was a problem with your submission. Please try again.";
pub const TOO_FAST_REJECTION_COPY: &str = "Please take a moment to review your message before submitting.";
pub const ACCEPTED_COPY: &str = "We've received your message and will get back to you within 24 hours.";

/// Which anti-bot rule rejected a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotReason {
    HoneypotFilled,
    TooFast,
}

impl BotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotReason::HoneypotFilled => "honeypot_filled",
            BotReason::TooFast => "too_fast",
        }
    }

    /// Generic copy shown to the visitor; never names the rule
    pub fn user_message(&self) -> &'static str {
        match self {
            BotReason::HoneypotFilled => HONEYPOT_REJECTION_COPY,
            BotReason::TooFast => TOO_FAST_REJECTION_COPY,
        }
    }
}

/// Progress of a form instance; drives the disabled/"Sending..." state of the button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Settled,
}

/// Outcome of one submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Accepted,
    Invalid(FieldErrors),
    RejectedBot(BotReason),
    DispatchFailed(String),
    /// Another submit on the same form is still in flight
    AlreadySubmitting,
}

impl SubmissionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionResult::Accepted)
    }

    /// Metric label for this outcome
    pub fn outcome_label(&self) -> &'static str {
        match self {
            SubmissionResult::Accepted => "accepted",
            SubmissionResult::Invalid(_) => "invalid",
            SubmissionResult::RejectedBot(reason) => reason.as_str(),
            SubmissionResult::DispatchFailed(_) => "dispatch_failed",
            SubmissionResult::AlreadySubmitting => "already_submitting",
        }
    }

    pub fn into_result(self) -> Result<(), SubmissionError> {
        match self {
            SubmissionResult::Accepted => Ok(()),
            SubmissionResult::Invalid(errors) => Err(SubmissionError::Validation(errors)),
            SubmissionResult::RejectedBot(reason) => Err(SubmissionError::BotRejected(reason)),
            SubmissionResult::DispatchFailed(detail) => Err(SubmissionError::Dispatch(detail)),
            SubmissionResult::AlreadySubmitting => Err(SubmissionError::InProgress),
        }
    }
}

/// Failure side of a submit attempt, as seen by callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Submission rejected")]
    BotRejected(BotReason),

    #[error("Mail dispatch failed: {0}")]
    Dispatch(String),

    #[error("A submission is already in progress")]
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// Transient toast shown after a submit attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    pub fn accepted() -> Self {
        Self {
            title: "Message sent!".to_string(),
            description: ACCEPTED_COPY.to_string(),
            variant: NotificationVariant::Default,
        }
    }

    pub fn rejected(reason: BotReason) -> Self {
        Self::error(reason.user_message())
    }

    pub fn dispatch_failed(fallback_email: &str) -> Self {
        Self::error(format!(
            "There was a problem sending your message. Please try again later or contact us directly at {}.",
            fallback_email
        ))
    }

    fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
        }
    }

    /// Toast for a result, if it gets one; field errors are shown inline instead
    pub fn for_result(result: &SubmissionResult, fallback_email: &str) -> Option<Self> {
        match result {
            SubmissionResult::Accepted => Some(Self::accepted()),
            SubmissionResult::RejectedBot(reason) => Some(Self::rejected(*reason)),
            SubmissionResult::DispatchFailed(_) => Some(Self::dispatch_failed(fallback_email)),
            SubmissionResult::Invalid(_) | SubmissionResult::AlreadySubmitting => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_copy_is_generic() {
        for reason in [BotReason::HoneypotFilled, BotReason::TooFast] {
            let copy = reason.user_message().to_lowercase();
            assert!(!copy.contains("bot"));
            assert!(!copy.contains("honeypot"));
            assert!(!copy.contains("fast"));
        }
    }

    #[test]
    fn test_dispatch_failure_mentions_fallback_address() {
        let result = SubmissionResult::DispatchFailed("smtp timeout".to_string());
        let toast = Notification::for_result(&result, "info@britoniapharmacy.com").unwrap();

        assert_eq!(toast.variant, NotificationVariant::Destructive);
        assert!(toast.description.contains("info@britoniapharmacy.com"));
        assert!(!toast.description.contains("smtp timeout"));
    }

    #[test]
    fn test_invalid_has_no_toast() {
        let result = SubmissionResult::Invalid(FieldErrors::new());
        assert!(Notification::for_result(&result, "x@example.com").is_none());
    }

    #[test]
    fn test_into_result_maps_taxonomy() {
        assert!(SubmissionResult::Accepted.into_result().is_ok());
        assert_eq!(
            SubmissionResult::RejectedBot(BotReason::TooFast).into_result(),
            Err(SubmissionError::BotRejected(BotReason::TooFast))
        );
        assert_eq!(
            SubmissionResult::AlreadySubmitting.into_result(),
            Err(SubmissionError::InProgress)
        );
    }

    #[test]
    fn test_bot_rejection_error_is_opaque() {
        let err = SubmissionError::BotRejected(BotReason::HoneypotFilled);
        assert_eq!(err.to_string(), "Submission rejected");
    }
}
