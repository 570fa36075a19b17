//! Domain-level errors

use thiserror::Error;

/// Errors raised by domain validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Phone number failed validation
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}
