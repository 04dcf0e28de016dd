// ============================================================================
// Log Sanitization - keep visitor input from forging or flooding log lines
// ============================================================================
//
// Every string typed into the public contact form is untrusted. Before any
// of it reaches a log line we strip line breaks, ANSI escapes and control
// characters, and cap its length. Submitter addresses are masked: operators
// need to correlate entries, not read inboxes out of the logs.
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept from one logged value
const MAX_LOG_LENGTH: usize = 200;

static ANSI_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("ANSI escape pattern is valid")
});

/// Sanitize user input for safe logging
///
/// ```
/// use britonia_contact::utils::log_sanitizer::sanitize_for_log;
///
/// assert_eq!(
///     sanitize_for_log("Ama\nINFO: Fake log entry"),
///     "Ama INFO: Fake log entry"
/// );
/// assert_eq!(sanitize_for_log("test\x1b[31mred\x1b[0m"), "testred");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let no_ansi = ANSI_ESCAPE_REGEX.replace_all(input, "");

    let cleaned: String = no_ansi
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    // Truncate on a char boundary; names and messages are often non-ASCII
    if cleaned.chars().count() > MAX_LOG_LENGTH {
        let truncated: String = cleaned.chars().take(MAX_LOG_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        cleaned
    }
}

/// Sanitize an optional string for logging
pub fn sanitize_option_for_log(input: &Option<String>) -> String {
    match input {
        Some(value) => sanitize_for_log(value),
        None => "None".to_string(),
    }
}

/// Mask an email address, keeping the first character and the domain
///
/// `ama.mensah@example.com` becomes `a***@example.com`. Anything that does
/// not look like an address is fully redacted.
pub fn mask_email_for_log(email: &str) -> String {
    let email = sanitize_for_log(email.trim());

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => redact_sensitive(&email),
    }
}

/// Replace a value with its length only
pub fn redact_sensitive(input: &str) -> String {
    format!("[REDACTED-{}]", input.chars().count())
}
