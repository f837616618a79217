//! Email addresses used to identify users.

use std::{fmt::Display, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A non-empty local part, a single "@", and a domain with a "." that has text on either side.
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap())
}

/// An email address that has passed a basic format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return [Error::InvalidEmail] if `raw_email` does not
    /// look like an email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        if email_regex().is_match(raw_email) {
            Ok(Self(raw_email.to_owned()))
        } else {
            Err(Error::InvalidEmail)
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email address,
    /// e.g. because it was read back from the database.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if an incorrectly
    /// formatted email is provided it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(raw_email: String) -> Self {
        Self(raw_email)
    }

    /// The part of the address before the "@".
    pub fn local_part(&self) -> &str {
        self.0
            .split_once('@')
            .map(|(local_part, _)| local_part)
            .unwrap_or(&self.0)
    }

    /// The email address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
