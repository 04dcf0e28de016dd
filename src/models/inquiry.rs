use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Field name of the hidden anti-bot input
pub const HONEYPOT_FIELD: &str = "honeypot";

/// Raw contact form state as typed by the visitor
///
/// `form_opened_at` is captured once when the form is built and travels with
/// the rest of the fields as a hidden value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InquiryInput {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 5, message = "Subject must be at least 5 characters"))]
    pub subject: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Message must be at least 10 characters"))]
    pub message: String,

    #[serde(default)]
    pub company: Option<String>,

    // Hidden from humans; anything typed here came from an automated filler
    #[serde(default)]
    #[validate(length(max = 0, message = "Bot detected"))]
    pub honeypot: String,

    /// Milliseconds since the Unix epoch
    pub form_opened_at: i64,
}

impl InquiryInput {
    /// Empty form opened at `form_opened_at`
    pub fn blank(form_opened_at: i64) -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            subject: String::new(),
            message: String::new(),
            company: None,
            honeypot: String::new(),
            form_opened_at,
        }
    }

    /// Run the schema rules and collect per-field messages
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }

    /// Drop the anti-bot fields, keeping only what leaves the process
    pub fn to_payload(&self) -> InquiryPayload {
        InquiryPayload {
            name: self.name.clone(),
            email: self.email.clone(),
            subject: self.subject.clone(),
            message: self.message.clone(),
            company: normalize_company(self.company.as_deref()),
        }
    }
}

fn normalize_company(company: Option<&str>) -> Option<String> {
    company
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// The only inquiry shape sent to a mail dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct InquiryPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub subject: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl InquiryPayload {
    /// Company name for email bodies
    pub fn company_or_default(&self) -> &str {
        self.company
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("Not provided")
    }
}

/// Human-readable violations keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of fields with at least one violation
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}
