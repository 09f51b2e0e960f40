//! Credential shape checks.
//!
//! Both checks run on the `regex` crate, whose automata guarantee matching in
//! time linear in the input. The password rule is a conjunction of classes, so
//! it is evaluated as independent scans instead of lookaheads.

use regex::Regex;
use thiserror::Error;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";
const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Error)]
#[error("validation engine fault: {0}")]
pub struct ValidationEngineError(#[from] regex::Error);

#[derive(Debug, Clone)]
pub struct Validator {
    email: Regex,
    lower: Regex,
    upper: Regex,
    digit: Regex,
}

impl Validator {
    pub fn new() -> Result<Self, ValidationEngineError> {
        Ok(Self {
            email: Regex::new(EMAIL_PATTERN)?,
            lower: Regex::new("[a-z]")?,
            upper: Regex::new("[A-Z]")?,
            digit: Regex::new("[0-9]")?,
        })
    }

    pub fn validate_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    /// At least eight characters with a lowercase letter, an uppercase letter
    /// and a digit. Anything else is allowed.
    pub fn validate_password(&self, password: &str) -> bool {
        password.chars().count() >= PASSWORD_MIN_CHARS
            && self.lower.is_match(password)
            && self.upper.is_match(password)
            && self.digit.is_match(password)
    }
}
