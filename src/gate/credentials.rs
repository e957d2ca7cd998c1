//! Operator credential shape checks, run before any network call.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

pub const EMAIL_MIN_LEN: usize = 5;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Trim and lower-case an email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and check an email. Returns the normalized form.
pub fn validate_email(raw: &str) -> Option<String> {
    let email = normalize_email(raw);
    let len = email.chars().count();
    if !(EMAIL_MIN_LEN..=EMAIL_MAX_LEN).contains(&len) {
        return None;
    }
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .is_ok_and(|regex| regex.is_match(&email))
        .then_some(email)
}

/// Length check on the password. The value is never trimmed.
pub fn validate_password(password: &SecretString) -> bool {
    let len = password.expose_secret().chars().count();
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
}
