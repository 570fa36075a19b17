//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Remote platform answered with a non-success status
    #[error("Remote call failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// Request never produced a response (network, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// External service behaved unexpectedly
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
