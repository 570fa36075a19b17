//! Phone number value object, normalized to bare digits

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A phone number normalized to digits only (e.g. `5511999999999`)
///
/// The gateway addresses numbers without a `+` prefix while the inbox
/// platform expects E.164; both renderings come from the same stored
/// digit string. Formatting characters (`+`, spaces, dashes, dots,
/// parentheses) are stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber {
    value: String,
}

impl PhoneNumber {
    /// Create a new phone number, keeping only ASCII digits
    ///
    /// Accepts 7-15 digits after normalization (country code included).
    pub fn new(number: impl Into<String>) -> Result<Self, DomainError> {
        let raw = number.into();
        let value: String = raw.chars().filter(char::is_ascii_digit).collect();

        if raw
            .chars()
            .any(|c| !c.is_ascii_digit() && !"+ -.()".contains(c))
        {
            return Err(DomainError::InvalidPhoneNumber(format!(
                "Unexpected character in phone number: {raw}"
            )));
        }

        if value.len() < 7 || value.len() > 15 {
            return Err(DomainError::InvalidPhoneNumber(
                "Phone number must have 7-15 digits".to_string(),
            ));
        }

        Ok(Self { value })
    }

    /// Digits-only rendering (gateway wire format)
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// E.164 rendering (inbox-platform wire format)
    pub fn e164(&self) -> String {
        format!("+{}", self.value)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
