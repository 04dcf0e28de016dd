pub mod bot_heuristic_service;
pub mod email_service;
pub mod mail_dispatch_service;
pub mod submission_coordinator;

pub use bot_heuristic_service::{BotHeuristicService, BotVerdict};
pub use email_service::{EmailService, MailError, MailTransport, SmtpMailTransport};
pub use mail_dispatch_service::{
    DispatchOutcome, HttpDispatchConfig, HttpMailDispatcher, MailDispatcher, UnconfiguredDispatcher,
};
pub use submission_coordinator::{ContactForm, SubmissionPipeline};
