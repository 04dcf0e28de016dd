pub mod tls;

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::bot_heuristic_service::MIN_FILL_TIME_MS;

const DEFAULT_MAILBOX: &str = "info@britoniapharmacy.com";

/// SMTP settings for the mail dispatch endpoint
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub from_email: String,
    /// Operations inbox that receives every inquiry
    pub to_email: String,
    /// Address shown to visitors when sending fails
    pub fallback_email: String,
}

impl MailConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            smtp_user: non_empty_var("SMTP_USER"),
            smtp_pass: non_empty_var("SMTP_PASS"),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| DEFAULT_MAILBOX.to_string()),
            to_email: env::var("TO_EMAIL").unwrap_or_else(|_| DEFAULT_MAILBOX.to_string()),
            fallback_email: env::var("CONTACT_FALLBACK_EMAIL")
                .unwrap_or_else(|_| DEFAULT_MAILBOX.to_string()),
        })
    }

    /// Username and password, only when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.smtp_user, &self.smtp_pass) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn smtp_security(&self) -> SmtpSecurity {
        SmtpSecurity::for_port(self.smtp_port)
    }
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// SMTPS, TLS from the first byte
    Implicit,
    /// Plain greeting, then STARTTLS
    StartTls,
}

impl SmtpSecurity {
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            SmtpSecurity::Implicit
        } else {
            SmtpSecurity::StartTls
        }
    }
}

impl Default for MailConfig {
    /// No credentials, so nothing can be sent
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            from_email: DEFAULT_MAILBOX.to_string(),
            to_email: DEFAULT_MAILBOX.to_string(),
            fallback_email: DEFAULT_MAILBOX.to_string(),
        }
    }
}

/// Per-IP limit on the public contact endpoints
#[derive(Debug, Clone)]
pub struct ContactRateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for ContactRateLimit {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub mail: MailConfig,
    pub bot_min_fill_time_ms: i64,
    pub contact_rate_limit: ContactRateLimit,
    pub tls: tls::TlsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            cors_origins: vec!["http://localhost:3000".to_string()],
            mail: MailConfig::default(),
            bot_min_fill_time_ms: MIN_FILL_TIME_MS,
            contact_rate_limit: ContactRateLimit::default(),
            tls: tls::TlsConfig::disabled(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", 8080)?,
            cors_origins,
            mail: MailConfig::from_env()?,
            bot_min_fill_time_ms: parse_var("BOT_MIN_FILL_TIME_MS", MIN_FILL_TIME_MS)?,
            contact_rate_limit: ContactRateLimit {
                max_requests: parse_var("CONTACT_RATE_LIMIT_MAX", 5)?,
                window: Duration::from_secs(parse_var("CONTACT_RATE_LIMIT_WINDOW_SECS", 600)?),
            },
            tls: tls::TlsConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: Some("ops".to_string()),
            smtp_pass: Some("secret".to_string()),
            from_email: DEFAULT_MAILBOX.to_string(),
            to_email: DEFAULT_MAILBOX.to_string(),
            fallback_email: DEFAULT_MAILBOX.to_string(),
        }
    }

    #[test]
    fn test_default_config_has_no_credentials() {
        let config = AppConfig::default();
        assert!(!config.mail.is_configured());
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.bot_min_fill_time_ms, 3000);
    }

    #[test]
    fn test_submission_port_uses_starttls() {
        assert_eq!(mail().smtp_security(), SmtpSecurity::StartTls);
        assert_eq!(SmtpSecurity::for_port(465), SmtpSecurity::Implicit);
        assert_eq!(SmtpSecurity::for_port(2525), SmtpSecurity::StartTls);
    }

    #[test]
    fn test_credentials_need_both_values() {
        assert_eq!(mail().credentials(), Some(("ops", "secret")));

        let mut config = mail();
        config.smtp_user = None;
        assert!(!config.is_configured());
    }

    #[test]
    fn test_parse_var_default_and_error() {
        std::env::remove_var("BRITONIA_TEST_PORT");
        assert_eq!(parse_var("BRITONIA_TEST_PORT", 42u16).unwrap(), 42);

        std::env::set_var("BRITONIA_TEST_PORT", "not-a-port");
        assert!(parse_var::<u16>("BRITONIA_TEST_PORT", 42).is_err());
        std::env::remove_var("BRITONIA_TEST_PORT");
    }
}
