//! Access-code normalization and grammar.
//!
//! A code is four characters over `[A-Z0-9]` holding exactly one letter and
//! three digits. The letter may sit in any of the four positions:
//!
//! ```text
//! L D D D
//! D L D D
//! D D L D
//! D D D L
//! ```

use std::fmt;

/// Length of every access code.
pub const CODE_LEN: usize = 4;

/// Character classes in a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Letter,
    Digit,
}

use Class::{Digit, Letter};

/// Every accepted arrangement, spelled out.
const PATTERNS: [[Class; CODE_LEN]; 4] = [
    [Letter, Digit, Digit, Digit],
    [Digit, Letter, Digit, Digit],
    [Digit, Digit, Letter, Digit],
    [Digit, Digit, Digit, Letter],
];

fn classify(c: char) -> Option<Class> {
    match c {
        'A'..='Z' => Some(Letter),
        '0'..='9' => Some(Digit),
        _ => None,
    }
}

/// Upper-case and keep only `[A-Z0-9]`. Total and idempotent.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| classify(*c).is_some())
        .collect()
}

/// Entry-time filter applied while the operator types: normalized and cut to
/// [`CODE_LEN`] characters.
pub fn filter_input(raw: &str) -> String {
    normalize(raw).chars().take(CODE_LEN).collect()
}

/// Rejection from [`validate`]. Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed access code")]
pub struct Malformed;

/// A code that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessCode(String);

impl AccessCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a candidate against the grammar. Does not normalize: callers pass
/// the output of [`normalize`], and nothing upstream is trusted.
pub fn validate(candidate: &str) -> Result<AccessCode, Malformed> {
    let classes: Vec<Class> = candidate
        .chars()
        .map(classify)
        .collect::<Option<Vec<_>>>()
        .ok_or(Malformed)?;

    if PATTERNS.iter().any(|pattern| classes == pattern) {
        Ok(AccessCode(candidate.to_string()))
    } else {
        Err(Malformed)
    }
}
